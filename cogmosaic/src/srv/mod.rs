mod mosaics;

mod response;
pub use response::{map_internal_error, public_url, respond};

mod server;
pub use server::{new_server, router};

mod tiles;
