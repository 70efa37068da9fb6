pub mod byte_link;
