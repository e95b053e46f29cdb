//! Sender identity splitting (`From:` → bare address + display name).

use crate::parser::header::decode_header_value;

/// A sender split into its bare address and decoded display name.
///
/// # Examples
/// - `"\"Jane Doe\" <jane@x.com>"` → `address = "jane@x.com"`, `name = "Jane Doe"`
/// - `"plain@x.com"` → `address = "plain@x.com"`, `name = "plain@x.com"`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SenderIdentity {
    /// The bare email address, `None` when nothing is left after splitting.
    pub address: Option<String>,
    /// Decoded, unquoted display name.
    pub name: Option<String>,
}

impl SenderIdentity {
    /// Split a raw `From:` value.
    ///
    /// With angle brackets, the address is the text after the last `<` up to
    /// the following `>` (or the end), and the name is the text before that
    /// `<`, RFC 2047-decoded and unquoted. Without brackets both parts are
    /// the whole field, the name being decoded.
    pub fn split(raw: &str) -> Self {
        let trimmed = raw.trim();

        if let Some(angle_start) = trimmed.rfind('<') {
            let tail = &trimmed[angle_start + 1..];
            let addr = tail.find('>').map_or(tail, |end| &tail[..end]);
            let name_part = strip_quotes(&trimmed[..angle_start]);
            return Self {
                address: non_empty(addr),
                name: non_empty(&strip_quotes(&decode_header_value(&name_part))),
            };
        }

        Self {
            address: non_empty(trimmed),
            name: non_empty(&decode_header_value(trimmed)),
        }
    }
}

/// Strip surrounding double-quotes and trim whitespace.
fn strip_quotes(s: &str) -> String {
    let trimmed = s.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        trimmed[1..trimmed.len() - 1].trim().to_string()
    } else {
        trimmed.to_string()
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_quoted_name() {
        let id = SenderIdentity::split("\"Jane Doe\" <jane@x.com>");
        assert_eq!(id.address.as_deref(), Some("jane@x.com"));
        assert_eq!(id.name.as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn test_split_bare_address() {
        let id = SenderIdentity::split("plain@x.com");
        assert_eq!(id.address.as_deref(), Some("plain@x.com"));
        assert_eq!(id.name.as_deref(), Some("plain@x.com"));
    }

    #[test]
    fn test_split_encoded_name() {
        let id = SenderIdentity::split("=?UTF-8?B?Sm9zw6kgR2FyY8OtYQ==?= <jose@ejemplo.com>");
        assert_eq!(id.address.as_deref(), Some("jose@ejemplo.com"));
        assert_eq!(id.name.as_deref(), Some("José García"));
    }

    #[test]
    fn test_split_quoted_encoded_name() {
        let id = SenderIdentity::split("\"=?ISO-8859-1?Q?Fran=E7ois?=\" <f@ex.fr>");
        assert_eq!(id.name.as_deref(), Some("François"));
    }

    #[test]
    fn test_split_uses_last_angle_bracket() {
        let id = SenderIdentity::split("Team <ops> <ops@corp.io>");
        assert_eq!(id.address.as_deref(), Some("ops@corp.io"));
        assert_eq!(id.name.as_deref(), Some("Team <ops>"));
    }

    #[test]
    fn test_split_angle_only_has_no_name() {
        let id = SenderIdentity::split("<noreply@shop.com>");
        assert_eq!(id.address.as_deref(), Some("noreply@shop.com"));
        assert_eq!(id.name, None);
    }

    #[test]
    fn test_split_unterminated_bracket() {
        let id = SenderIdentity::split("Bob <bob@b.org");
        assert_eq!(id.address.as_deref(), Some("bob@b.org"));
        assert_eq!(id.name.as_deref(), Some("Bob"));
    }
}
