//! CWC office codes.
//!
//! An office code packs chamber, state and seat into five characters:
//! `S{state}{class - 1:02}` for senators and `H{state}{district:02}` for
//! representatives, e.g. `SCA00` (California, class 1) or `HTX07`.

use crate::error::OfficeCodeError;
use crate::models::{Chamber, LegislatorProfile};
use std::fmt;
use std::str::FromStr;

const CODE_LEN: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OfficeCode {
    chamber: Chamber,
    state: String,
    /// Senate class (1..=3) or house district (0 for at-large).
    seat: u8,
}

impl OfficeCode {
    pub fn senate(state: &str, class: u8) -> Option<Self> {
        (valid_state(state) && (1..=3).contains(&class)).then(|| Self {
            chamber: Chamber::Senate,
            state: state.to_string(),
            seat: class,
        })
    }

    pub fn house(state: &str, district: u8) -> Option<Self> {
        (valid_state(state) && district <= 99).then(|| Self {
            chamber: Chamber::House,
            state: state.to_string(),
            seat: district,
        })
    }

    /// `None` when the profile has no chamber or seat; callers should fall
    /// back to the web form.
    pub fn for_profile(profile: &LegislatorProfile) -> Option<Self> {
        match profile.chamber? {
            Chamber::Senate => Self::senate(&profile.state, profile.senate_class?),
            Chamber::House => Self::house(&profile.state, profile.house_district?),
        }
    }

    pub fn chamber(&self) -> Chamber {
        self.chamber
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn senate_class(&self) -> Option<u8> {
        (self.chamber == Chamber::Senate).then_some(self.seat)
    }

    pub fn house_district(&self) -> Option<u8> {
        (self.chamber == Chamber::House).then_some(self.seat)
    }

    /// Key used by the legislator seat index.
    pub fn seat_key(&self) -> String {
        format!("{}:{}:{}", self.chamber, self.state, self.seat)
    }
}

impl fmt::Display for OfficeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.chamber {
            Chamber::Senate => write!(f, "S{}{:02}", self.state, self.seat - 1),
            Chamber::House => write!(f, "H{}{:02}", self.state, self.seat),
        }
    }
}

impl FromStr for OfficeCode {
    type Err = OfficeCodeError;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        if code.len() != CODE_LEN || !code.is_ascii() {
            return Err(OfficeCodeError::malformed(code, "expected 5 ASCII characters"));
        }
        let (prefix, rest) = code.split_at(1);
        let (state, digits) = rest.split_at(2);
        if !valid_state(state) {
            return Err(OfficeCodeError::malformed(code, "state must be two uppercase letters"));
        }
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(OfficeCodeError::malformed(code, "seat must be two digits"));
        }
        let number: u8 = digits
            .parse()
            .map_err(|_| OfficeCodeError::malformed(code, "seat must be two digits"))?;

        match prefix {
            "S" => Self::senate(state, number + 1)
                .ok_or_else(|| OfficeCodeError::malformed(code, "senate seat must be 00, 01 or 02")),
            "H" => Self::house(state, number)
                .ok_or_else(|| OfficeCodeError::malformed(code, "invalid house district")),
            _ => Err(OfficeCodeError::malformed(code, "chamber must be S or H")),
        }
    }
}

fn valid_state(state: &str) -> bool {
    state.len() == 2 && state.chars().all(|c| c.is_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_profiles() {
        let senator = LegislatorProfile::senator("F000062", "CA", 1);
        assert_eq!(OfficeCode::for_profile(&senator).unwrap().to_string(), "SCA00");

        let senator = LegislatorProfile::senator("P000145", "CA", 3);
        assert_eq!(OfficeCode::for_profile(&senator).unwrap().to_string(), "SCA02");

        let rep = LegislatorProfile::representative("B001291", "TX", 7);
        assert_eq!(OfficeCode::for_profile(&rep).unwrap().to_string(), "HTX07");

        let at_large = LegislatorProfile::representative("Y000033", "AK", 0);
        assert_eq!(OfficeCode::for_profile(&at_large).unwrap().to_string(), "HAK00");
    }

    #[test]
    fn missing_chamber_or_seat_is_a_hint_not_a_fault() {
        let mut profile = LegislatorProfile::new("X000001", "CA");
        assert!(OfficeCode::for_profile(&profile).is_none());

        profile.chamber = Some(Chamber::Senate);
        assert!(OfficeCode::for_profile(&profile).is_none());
    }

    #[test]
    fn round_trips_every_valid_code() {
        for state in ["CA", "NY", "AK", "DC"] {
            for seat in 0..=2 {
                let code = format!("S{state}{seat:02}");
                assert_eq!(code.parse::<OfficeCode>().unwrap().to_string(), code);
            }
            for district in 0..=99 {
                let code = format!("H{state}{district:02}");
                let parsed: OfficeCode = code.parse().unwrap();
                assert_eq!(parsed.house_district(), Some(district));
                assert_eq!(parsed.to_string(), code);
            }
        }
    }

    #[test]
    fn decodes_seat_details() {
        let code: OfficeCode = "SNY01".parse().unwrap();
        assert_eq!(code.chamber(), Chamber::Senate);
        assert_eq!(code.state(), "NY");
        assert_eq!(code.senate_class(), Some(2));
        assert_eq!(code.house_district(), None);
        assert_eq!(code.seat_key(), "senate:NY:2");
    }

    #[test]
    fn malformed_codes_are_rejected() {
        for bad in ["", "SCA0", "SCA000", "XCA01", "Sca01", "SCA03", "SC101", "HCAxx", "HCA-1", "ÉCA01"] {
            let err = bad.parse::<OfficeCode>().unwrap_err();
            assert!(matches!(err, OfficeCodeError::Malformed { .. }), "{bad}");
        }
    }
}
