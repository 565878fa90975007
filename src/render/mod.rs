pub(crate) mod background;
pub(crate) mod compositor;
pub(crate) mod font;
pub(crate) mod frames;
pub(crate) mod pipeline;
pub(crate) mod text;
