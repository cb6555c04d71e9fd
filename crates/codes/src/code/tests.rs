use pretty_assertions::assert_eq;

use super::*;

#[test]
fn parse_normalizes_case_and_whitespace() {
	assert_eq!(InvitationCode::parse(" abc123\n").unwrap().as_str(), "ABC123");
	assert_eq!("Zz09Aa".parse::<InvitationCode>().unwrap().to_string(), "ZZ09AA");
}

#[test]
fn parse_rejects_bad_shapes() {
	for input in ["", "ABC12", "ABC1234", "ABC-12", "ABC 12", "ÄBC123", "abc12ß"] {
		assert_eq!(
			InvitationCode::parse(input),
			Err(CodeError::Validation(input.to_string())),
			"{input:?} should be rejected"
		);
	}
}

#[test]
fn from_symbols_round_trips_through_parse() {
	let code = InvitationCode::from_symbols(*b"Q7Q7Q7");
	assert_eq!(InvitationCode::parse(code.as_str()), Ok(code));
}
