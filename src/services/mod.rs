pub mod cursor;
pub mod drawing;
pub mod relay;
pub mod room;
