mod root;
pub use root::*;

mod srv;
pub use srv::*;
