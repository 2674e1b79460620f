pub mod rating;
pub mod shipment;
