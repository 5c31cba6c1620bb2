pub mod channel_gc;
