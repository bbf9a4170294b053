mod coordinates;
pub use self::coordinates::*;

mod hash_table;
pub use self::hash_table::*;

mod membership;
pub use self::membership::*;

mod neighbors;
pub use self::neighbors::*;

pub mod passes;

mod values;
pub use self::values::*;
