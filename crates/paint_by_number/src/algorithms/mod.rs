pub mod grayscale;
pub mod detection;
pub mod cleaning;
pub mod segmentation;
pub mod placement;

pub use grayscale::*;
pub use detection::*;
pub use cleaning::*;
pub use segmentation::*;
pub use placement::*;
