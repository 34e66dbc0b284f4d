use serde::{Deserialize, Serialize};

use super::SchemaError;

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// The string form doubles as the serialized form.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = SchemaError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(SchemaError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(Answer {
    Yes => "Y",
    No => "N",
    NotApplicable => "NA",
    NotObserved => "NO",
});

str_enum!(AnswerScale {
    YesNo => "yes_no",
    Full => "full",
});

impl Answer {
    /// Column heading used on the rendered form.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Yes => "Yes",
            Self::No => "No",
            Self::NotApplicable => "N/A",
            Self::NotObserved => "N/O",
        }
    }
}

impl AnswerScale {
    /// Answers offered for this scale, in column order.
    pub fn answers(&self) -> &'static [Answer] {
        match self {
            Self::YesNo => &[Answer::Yes, Answer::No],
            Self::Full => &[
                Answer::Yes,
                Answer::No,
                Answer::NotApplicable,
                Answer::NotObserved,
            ],
        }
    }

    pub fn allows(&self, answer: Answer) -> bool {
        self.answers().contains(&answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn answer_codes_round_trip() {
        for code in ["Y", "N", "NA", "NO"] {
            let answer = Answer::from_str(code).unwrap();
            assert_eq!(answer.as_str(), code);
        }
    }

    #[test]
    fn answer_rejects_unknown_code() {
        let err = Answer::from_str("maybe").unwrap_err();
        assert!(err.to_string().contains("maybe"));
    }

    #[test]
    fn answer_serializes_as_code() {
        let json = serde_json::to_string(&Answer::NotObserved).unwrap();
        assert_eq!(json, "\"NO\"");
        let back: Answer = serde_json::from_str("\"NA\"").unwrap();
        assert_eq!(back, Answer::NotApplicable);
    }

    #[test]
    fn yes_no_scale_excludes_na_and_no() {
        assert!(AnswerScale::YesNo.allows(Answer::Yes));
        assert!(AnswerScale::YesNo.allows(Answer::No));
        assert!(!AnswerScale::YesNo.allows(Answer::NotApplicable));
        assert!(!AnswerScale::YesNo.allows(Answer::NotObserved));
        assert_eq!(AnswerScale::Full.answers().len(), 4);
    }
}
