//! Layered authorization policy for viewing or deciding on a proof.
//!
//! The policy is a pure function over the proof's ownership, the feature
//! flags, and the requester's identities, so it is unit-testable without a
//! database. Handlers look up the active-guest-grant count first and map
//! the outcome to a response (render, redirect, or deny).

use proofdesk_core::types::DbId;

use crate::middleware::auth::{CustomerIdentity, StaffUser};

/// Inputs that gate access to one proof.
pub struct AccessRequest<'a> {
    pub proof_customer_id: Option<DbId>,
    pub share_id: &'a str,
    /// Count of currently-active guest grants for the proof.
    pub active_guest_grants: i64,
    pub staff: Option<&'a StaffUser>,
    pub customer: Option<&'a CustomerIdentity>,
    /// Share ids the requester has unlocked by PIN in this session.
    pub guest_unlocked: &'a [String],
    pub portal_enabled: bool,
    pub legacy_links_enabled: bool,
}

/// Policy outcome for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProofAccess {
    /// Render the proof. `portal_banner` asks the page to show a sign-in
    /// prompt (legacy soft enforcement).
    Granted { portal_banner: bool },
    /// Redirect the requester to the proof's guest PIN entry endpoint.
    RequireGuestPin,
    /// Redirect the requester to the customer portal login.
    RequireCustomerLogin,
}

/// Evaluate the access policy, in order:
///
/// 1. Unowned proof with at least one active guest grant: staff always view;
///    anyone else must have unlocked this proof's grant in-session.
/// 2. Customer-owned proof with the portal enabled: staff and the owning
///    customer view; others see the page with a banner when legacy links
///    are enabled, else are sent to the portal login.
/// 3. Everything else is publicly viewable (the original behavior).
pub fn evaluate(request: &AccessRequest<'_>) -> ProofAccess {
    match request.proof_customer_id {
        None if request.active_guest_grants > 0 => {
            if request.staff.is_some() {
                ProofAccess::Granted {
                    portal_banner: false,
                }
            } else if request
                .guest_unlocked
                .iter()
                .any(|s| s == request.share_id)
            {
                ProofAccess::Granted {
                    portal_banner: false,
                }
            } else {
                ProofAccess::RequireGuestPin
            }
        }
        Some(owner_id) if request.portal_enabled => {
            let staff_can_view = request.staff.is_some();
            let customer_can_view = request
                .customer
                .is_some_and(|c| c.customer_id == owner_id);
            if staff_can_view || customer_can_view {
                ProofAccess::Granted {
                    portal_banner: false,
                }
            } else if request.legacy_links_enabled {
                ProofAccess::Granted {
                    portal_banner: true,
                }
            } else {
                ProofAccess::RequireCustomerLogin
            }
        }
        _ => ProofAccess::Granted {
            portal_banner: false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staff(role: &str) -> StaffUser {
        StaffUser {
            user_id: 1,
            role: role.to_string(),
            csrf: "csrf".into(),
        }
    }

    fn customer(id: DbId) -> CustomerIdentity {
        CustomerIdentity {
            customer_id: id,
            csrf: "csrf".into(),
        }
    }

    fn request<'a>(share_id: &'a str, unlocked: &'a [String]) -> AccessRequest<'a> {
        AccessRequest {
            proof_customer_id: None,
            share_id,
            active_guest_grants: 0,
            staff: None,
            customer: None,
            guest_unlocked: unlocked,
            portal_enabled: false,
            legacy_links_enabled: true,
        }
    }

    #[test]
    fn unowned_proof_without_grants_is_public() {
        let unlocked = vec![];
        let req = request("abc12345", &unlocked);
        assert_eq!(
            evaluate(&req),
            ProofAccess::Granted {
                portal_banner: false
            }
        );
    }

    #[test]
    fn guest_gated_proof_requires_in_session_unlock() {
        let unlocked = vec![];
        let mut req = request("abc12345", &unlocked);
        req.active_guest_grants = 1;
        assert_eq!(evaluate(&req), ProofAccess::RequireGuestPin);
    }

    #[test]
    fn guest_gated_proof_opens_after_unlock() {
        let unlocked = vec!["abc12345".to_string()];
        let mut req = request("abc12345", &unlocked);
        req.active_guest_grants = 1;
        assert_eq!(
            evaluate(&req),
            ProofAccess::Granted {
                portal_banner: false
            }
        );
    }

    #[test]
    fn unlock_is_per_proof_not_per_session() {
        let unlocked = vec!["otherproof".to_string()];
        let mut req = request("abc12345", &unlocked);
        req.active_guest_grants = 1;
        assert_eq!(evaluate(&req), ProofAccess::RequireGuestPin);
    }

    #[test]
    fn staff_bypass_guest_pin() {
        let unlocked = vec![];
        let admin = staff("admin");
        let mut req = request("abc12345", &unlocked);
        req.active_guest_grants = 1;
        req.staff = Some(&admin);
        assert_eq!(
            evaluate(&req),
            ProofAccess::Granted {
                portal_banner: false
            }
        );
    }

    #[test]
    fn owned_proof_with_portal_disabled_is_public() {
        let unlocked = vec![];
        let mut req = request("abc12345", &unlocked);
        req.proof_customer_id = Some(9);
        req.portal_enabled = false;
        assert_eq!(
            evaluate(&req),
            ProofAccess::Granted {
                portal_banner: false
            }
        );
    }

    #[test]
    fn owning_customer_views_without_banner() {
        let unlocked = vec![];
        let owner = customer(9);
        let mut req = request("abc12345", &unlocked);
        req.proof_customer_id = Some(9);
        req.portal_enabled = true;
        req.legacy_links_enabled = false;
        req.customer = Some(&owner);
        assert_eq!(
            evaluate(&req),
            ProofAccess::Granted {
                portal_banner: false
            }
        );
    }

    #[test]
    fn wrong_customer_is_treated_as_anonymous() {
        let unlocked = vec![];
        let other = customer(10);
        let mut req = request("abc12345", &unlocked);
        req.proof_customer_id = Some(9);
        req.portal_enabled = true;
        req.legacy_links_enabled = false;
        req.customer = Some(&other);
        assert_eq!(evaluate(&req), ProofAccess::RequireCustomerLogin);
    }

    #[test]
    fn legacy_links_grant_access_with_banner() {
        let unlocked = vec![];
        let mut req = request("abc12345", &unlocked);
        req.proof_customer_id = Some(9);
        req.portal_enabled = true;
        req.legacy_links_enabled = true;
        assert_eq!(
            evaluate(&req),
            ProofAccess::Granted {
                portal_banner: true
            }
        );
    }

    #[test]
    fn portal_off_legacy_off_still_public_for_owned_proofs() {
        // With the portal feature disabled entirely, ownership is moot.
        let unlocked = vec![];
        let mut req = request("abc12345", &unlocked);
        req.proof_customer_id = Some(9);
        req.portal_enabled = false;
        req.legacy_links_enabled = false;
        assert_eq!(
            evaluate(&req),
            ProofAccess::Granted {
                portal_banner: false
            }
        );
    }
}
