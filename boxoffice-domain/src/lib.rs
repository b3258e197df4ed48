pub mod hold;
pub mod layout;
pub mod seat;

pub use hold::{RowRange, SeatHold};
pub use layout::{LayoutError, SeatLayout};
pub use seat::Seat;
