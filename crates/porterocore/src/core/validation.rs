//! Typed parsers for free-text admin input.
//!
//! Every multi-step form and admin command funnels its raw text through one
//! of these functions. Malformed input becomes a `ParseError` and a
//! re-prompt, never a half-applied write.

use thiserror::Error;

/// Errors produced while parsing admin input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("input is empty")]
    EmptyInput,

    #[error("duration must be a positive whole number of days, got '{0}'")]
    InvalidDuration(String),

    #[error("chat id must be an integer, got '{0}'")]
    InvalidChatId(String),

    #[error("expected 'InviteLink|ChatID', got '{0}'")]
    MalformedInviteTarget(String),

    #[error("expected 'UserID Days PlanName', got '{0}'")]
    MalformedGrant(String),
}

/// An invite destination: the join link shown to the buyer and the numeric
/// chat id the sweeper evicts from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviteTarget {
    pub invite_link: String,
    pub chat_id: i64,
}

/// A manual membership grant: `/grant 123456 30 VIP Movies`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantSpec {
    pub user_id: i64,
    pub days: i64,
    pub plan_name: String,
}

/// Parse a subscription duration in days. Must be a positive integer.
pub fn parse_duration_days(input: &str) -> Result<i64, ParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ParseError::EmptyInput);
    }
    match trimmed.parse::<i64>() {
        Ok(days) if days >= 1 => Ok(days),
        _ => Err(ParseError::InvalidDuration(trimmed.to_string())),
    }
}

/// Parse a numeric chat id (channel ids are negative, -100 prefixed).
pub fn parse_chat_id(input: &str) -> Result<i64, ParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ParseError::EmptyInput);
    }
    trimmed
        .parse::<i64>()
        .map_err(|_| ParseError::InvalidChatId(trimmed.to_string()))
}

/// Parse an `InviteLink|ChatID` pair as entered in the add-plan form.
pub fn parse_invite_target(input: &str) -> Result<InviteTarget, ParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ParseError::EmptyInput);
    }

    let (link, chat) = trimmed
        .split_once('|')
        .ok_or_else(|| ParseError::MalformedInviteTarget(trimmed.to_string()))?;

    let link = link.trim();
    if link.is_empty() {
        return Err(ParseError::MalformedInviteTarget(trimmed.to_string()));
    }

    let chat_id = chat
        .trim()
        .parse::<i64>()
        .map_err(|_| ParseError::MalformedInviteTarget(trimmed.to_string()))?;

    Ok(InviteTarget {
        invite_link: link.to_string(),
        chat_id,
    })
}

/// Parse a manual grant spec: `UserID Days PlanName...` where the plan name
/// may contain spaces.
pub fn parse_grant_spec(input: &str) -> Result<GrantSpec, ParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ParseError::EmptyInput);
    }

    let mut tokens = trimmed.split_whitespace();
    let user_raw = tokens.next().unwrap_or_default();
    let days_raw = tokens.next().unwrap_or_default();
    let plan_name = tokens.collect::<Vec<_>>().join(" ");

    let user_id = user_raw
        .parse::<i64>()
        .map_err(|_| ParseError::MalformedGrant(trimmed.to_string()))?;
    let days = parse_duration_days(days_raw).map_err(|_| ParseError::MalformedGrant(trimmed.to_string()))?;

    if plan_name.is_empty() {
        return Err(ParseError::MalformedGrant(trimmed.to_string()));
    }

    Ok(GrantSpec {
        user_id,
        days,
        plan_name,
    })
}

/// Split a comma-separated bundle link list, dropping empty segments.
pub fn parse_bundle_links(input: &str) -> Result<Vec<String>, ParseError> {
    let links: Vec<String> = input
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if links.is_empty() {
        return Err(ParseError::EmptyInput);
    }
    Ok(links)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn duration_accepts_positive_integers() {
        assert_eq!(parse_duration_days("30"), Ok(30));
        assert_eq!(parse_duration_days(" 1 "), Ok(1));
    }

    #[test]
    fn duration_rejects_zero_negative_and_garbage() {
        assert!(matches!(parse_duration_days("0"), Err(ParseError::InvalidDuration(_))));
        assert!(matches!(parse_duration_days("-5"), Err(ParseError::InvalidDuration(_))));
        assert!(matches!(parse_duration_days("month"), Err(ParseError::InvalidDuration(_))));
        assert!(matches!(parse_duration_days(""), Err(ParseError::EmptyInput)));
    }

    #[test]
    fn invite_target_parses_link_and_chat() {
        let target = parse_invite_target("https://t.me/+AbCdEf|-1005551234567").unwrap();
        assert_eq!(target.invite_link, "https://t.me/+AbCdEf");
        assert_eq!(target.chat_id, -1005551234567);
    }

    #[test]
    fn invite_target_rejects_missing_separator_or_bad_chat() {
        assert!(matches!(
            parse_invite_target("https://t.me/+AbCdEf"),
            Err(ParseError::MalformedInviteTarget(_))
        ));
        assert!(matches!(
            parse_invite_target("https://t.me/+AbCdEf|notachat"),
            Err(ParseError::MalformedInviteTarget(_))
        ));
        assert!(matches!(
            parse_invite_target("|123"),
            Err(ParseError::MalformedInviteTarget(_))
        ));
    }

    #[test]
    fn grant_spec_keeps_spaces_in_plan_name() {
        let grant = parse_grant_spec("123456 30 VIP Movies Pack").unwrap();
        assert_eq!(
            grant,
            GrantSpec {
                user_id: 123456,
                days: 30,
                plan_name: "VIP Movies Pack".to_string(),
            }
        );
    }

    #[test]
    fn grant_spec_rejects_short_or_invalid_input() {
        assert!(parse_grant_spec("123456 30").is_err());
        assert!(parse_grant_spec("abc 30 VIP").is_err());
        assert!(parse_grant_spec("123456 zero VIP").is_err());
    }

    #[test]
    fn bundle_links_split_and_trim() {
        let links = parse_bundle_links("https://t.me/+a, https://t.me/+b ,").unwrap();
        assert_eq!(links, vec!["https://t.me/+a", "https://t.me/+b"]);
        assert!(matches!(parse_bundle_links(" , "), Err(ParseError::EmptyInput)));
    }
}
