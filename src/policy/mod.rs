pub mod increment;
pub mod settlement;
pub mod window;
