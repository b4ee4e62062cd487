use snowflaked::sync::Generator;

const INSTANCE: u16 = 0;

pub static ROUND: Generator = Generator::new_unchecked(INSTANCE);
pub static MATCH: Generator = Generator::new_unchecked(INSTANCE);
