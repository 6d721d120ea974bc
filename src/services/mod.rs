pub mod cloudinary;
pub mod gallery_service;
pub mod media_store;
pub mod normalize;
