pub mod compare;
pub mod groups;
pub mod project;
pub mod scan;
pub mod util;

pub use compare::*;
pub use groups::*;
pub use project::*;
pub use scan::*;
pub use util::*;
