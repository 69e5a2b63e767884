//! Message composition helpers: placeholder substitution, subjects and
//! threading identifiers

use std::collections::BTreeMap;

use shared::Stage;

/// Replace every `{Key}` with the matching field value
///
/// Tokens that name no field are left verbatim.
pub fn substitute_fields(template: &str, fields: &BTreeMap<String, String>) -> String {
    let mut content = template.to_string();
    for (key, value) in fields {
        content = content.replace(&format!("{{{key}}}"), value);
    }
    content
}

/// Subject line for a lead at a given stage
pub fn build_subject(template: &str, fields: &BTreeMap<String, String>, stage: Stage) -> String {
    let base = substitute_fields(template, fields).trim().to_string();
    match stage {
        Stage::Fresh => base,
        Stage::Followup => reply_subject(&base),
    }
}

/// Prefix `Re: ` unless the subject already carries a reply marker
pub fn reply_subject(subject: &str) -> String {
    let already_reply = subject
        .get(..3)
        .map(|prefix| prefix.eq_ignore_ascii_case("re:"))
        .unwrap_or(false);

    if already_reply {
        subject.to_string()
    } else {
        format!("Re: {subject}")
    }
}

/// Wrap a message identifier in angle brackets if they are missing
pub fn normalize_message_id(id: &str) -> String {
    let id = id.trim().trim_start_matches('<').trim_end_matches('>');
    format!("<{id}>")
}
