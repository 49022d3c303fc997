pub mod scan;

pub use scan::handle_scan;
