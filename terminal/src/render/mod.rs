pub mod lanes;
pub mod layout;

pub use lanes::{label_line, Cell, LaneGrid, LaneRenderer};
pub use layout::PlayfieldLayout;
