//! Notification template rendering.
//!
//! Operator-supplied subject/body templates use a small fixed placeholder
//! vocabulary (`{{customer_name}}`, `{{job_name}}`, `{{proof_link}}`,
//! `{{designer_name}}`, `{{invite_link}}`, `{{guest_pin}}`). Substitution is
//! literal find-and-replace; there are no conditionals, loops, or escaping.
//! Unrecognized tokens pass through untouched so a typo never aborts a send.

use std::sync::LazyLock;

use regex::Regex;

/// Built-in subject used when the operator left the template blank.
pub const DEFAULT_SUBJECT_TEMPLATE: &str = "New proof ready: {{job_name}}";

/// Built-in body used when the operator left the template blank.
pub const DEFAULT_BODY_TEMPLATE: &str = "Hi {{customer_name}},\n\n\
A new proof \"{{job_name}}\" is ready for your review.\n\
You can view it here: {{proof_link}}\n\n\
If you have feedback, feel free to leave a comment directly on the approval page.\n\n\
Regards,\n\
{{designer_name}}";

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[a-zA-Z/!][^>]*>").expect("valid tag regex"));
static LINE_BREAK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>|</p>").expect("valid line-break regex"));

/// Placeholder values available to a notification template.
///
/// `invite_link` and `guest_pin` substitute as empty strings when absent so
/// a template that mentions them degrades to blank rather than leaking the
/// raw token syntax.
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    pub customer_name: String,
    pub job_name: String,
    pub proof_link: String,
    pub designer_name: String,
    pub invite_link: Option<String>,
    pub guest_pin: Option<String>,
}

impl TemplateContext {
    fn pairs(&self) -> [(&'static str, &str); 6] {
        [
            ("{{customer_name}}", self.customer_name.as_str()),
            ("{{job_name}}", self.job_name.as_str()),
            ("{{proof_link}}", self.proof_link.as_str()),
            ("{{designer_name}}", self.designer_name.as_str()),
            ("{{invite_link}}", self.invite_link.as_deref().unwrap_or("")),
            ("{{guest_pin}}", self.guest_pin.as_deref().unwrap_or("")),
        ]
    }
}

/// The concrete text to email, after substitution and HTML classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedNotification {
    pub subject: String,
    /// Plain-text body. When `html_body` is set this is the stripped-tag
    /// fallback for recipients that cannot render HTML.
    pub body: String,
    pub html_body: Option<String>,
}

/// Default subject template, overridable via `CUSTOMER_NOTIFY_DEFAULT_SUBJECT`.
pub fn default_subject_template() -> String {
    std::env::var("CUSTOMER_NOTIFY_DEFAULT_SUBJECT")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SUBJECT_TEMPLATE.to_string())
}

/// Default body template, overridable via `CUSTOMER_NOTIFY_DEFAULT_BODY`.
pub fn default_body_template() -> String {
    std::env::var("CUSTOMER_NOTIFY_DEFAULT_BODY")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_BODY_TEMPLATE.to_string())
}

fn substitute(template: &str, context: &TemplateContext) -> String {
    let mut rendered = template.to_string();
    for (token, value) in context.pairs() {
        rendered = rendered.replace(token, value);
    }
    rendered
}

/// True when the text contains any markup tag.
pub fn looks_like_html(text: &str) -> bool {
    TAG_RE.is_match(text)
}

/// Derive a plain-text fallback from an HTML body: line-break tags become
/// newlines, every other tag is stripped.
pub fn strip_html(html: &str) -> String {
    let with_breaks = LINE_BREAK_RE.replace_all(html, "\n");
    TAG_RE.replace_all(&with_breaks, "").trim().to_string()
}

/// Render a notification from operator templates and a placeholder context.
///
/// Blank templates fall back to the configured defaults before substitution.
/// When `context.invite_link` is set, the returned body is guaranteed to
/// contain the literal invite URL: if the template did not produce it, the
/// link is appended with a short lead-in.
pub fn render_notification(
    subject_template: Option<&str>,
    body_template: Option<&str>,
    context: &TemplateContext,
) -> RenderedNotification {
    let subject_tpl = match subject_template.map(str::trim) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => default_subject_template(),
    };
    let body_tpl = match body_template.map(str::trim) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => default_body_template(),
    };

    let subject = substitute(&subject_tpl, context);
    let mut body = substitute(&body_tpl, context);

    if let Some(invite_link) = context.invite_link.as_deref() {
        let trimmed = body.trim().to_string();
        body = if trimmed.contains(invite_link) {
            trimmed
        } else {
            format!("{trimmed}\n\nSet up your customer portal account here: {invite_link}")
        };
    }

    if looks_like_html(&body) {
        let fallback = strip_html(&body);
        RenderedNotification {
            subject,
            body: fallback,
            html_body: Some(body),
        }
    } else {
        RenderedNotification {
            subject,
            body,
            html_body: None,
        }
    }
}
