pub mod dbconnection;
pub mod schema;
pub mod statement;
pub mod type_map;
