pub mod color;
pub mod histogram;
pub mod motion;
pub mod options;
pub mod pixel;
pub mod pixel_buffer;
pub mod result;
pub mod roi;
pub mod top_k;
