pub mod mastervolt;
