pub mod colour_order;
