//! Contact-info redaction for chat messages.
//!
//! Buyers and sellers must negotiate through the platform chat, so messages
//! are scanned for anything that looks like off-platform contact data:
//! phone numbers, messaging-app keywords, social handles, emails, URLs, and
//! bare long digit runs. Matches are replaced with a fixed safety marker.

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

/// Marker inserted in place of every detected contact-info substring.
pub const REDACTION_MARKER: &str = "🔒 Dados de contato são ocultados. Use o chat seguro da plataforma.";

/// Detection passes, applied in order against the current working string.
/// Phones run before the generic digit-run pass so a formatted number is
/// consumed as a phone rather than as a bare digit sequence; callers only
/// observe the final string and flag, so order never changes the outcome.
static PASSES: LazyLock<[Regex; 6]> = LazyLock::new(|| {
    [
        // Phone numbers, optional (DD) area code: (11) 98888-7777, 98888 7777, 4444-4444
        Regex::new(r"(\(?\d{2}\)?\s?)?(\d{4,5}[-\s]?\d{4})"),
        // Messaging-app keywords
        Regex::new(r"(?i)(whats?app?|zap|wpp)"),
        // Social handles
        Regex::new(r"(?i)(@\w+|instagram|insta)"),
        // Emails
        Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}"),
        // External links
        Regex::new(r"(https?://[^\s]+|www\.[^\s]+)"),
        // Bare runs of 8+ digits. Known to also catch non-contact numbers
        // such as VIN fragments or unseparated prices.
        Regex::new(r"\b\d{8,}\b"),
    ]
    .map(|re| re.expect("redaction pattern must compile"))
});

/// Result of scanning one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redaction {
    pub filtered: String,
    pub is_filtered: bool,
}

/// Scans `message` and replaces every contact-info match with
/// [`REDACTION_MARKER`]. Total over all inputs; never fails.
///
/// Each pass rescans the output of the previous one, so text inserted by an
/// earlier replacement is opaque to later passes (the marker itself matches
/// none of them).
#[must_use]
pub fn redact(message: &str) -> Redaction {
    let mut filtered = Cow::Borrowed(message);
    let mut is_filtered = false;

    for pass in PASSES.iter() {
        match pass.replace_all(&filtered, REDACTION_MARKER) {
            Cow::Borrowed(_) => {}
            Cow::Owned(replaced) => {
                filtered = Cow::Owned(replaced);
                is_filtered = true;
            }
        }
    }

    Redaction { filtered: filtered.into_owned(), is_filtered }
}
