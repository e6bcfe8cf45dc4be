/// The scalar types of the language. Every value, variable and function
/// return has exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Type {
    /// int
    Int,
    /// dec
    #[strum(to_string = "decimal", serialize = "dec")]
    Decimal,
}

impl Type {
    /// Every scalar occupies one machine word in its storage class
    pub const WORD_SIZE: u32 = 4;

    pub fn size(self) -> u32 {
        match self {
            Type::Int | Type::Decimal => Self::WORD_SIZE,
        }
    }
}
