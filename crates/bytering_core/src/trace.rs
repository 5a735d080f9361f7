// Verbose tracing is compiled in only with the `trace` feature. Without it
// the macro expands to nothing and the arguments are never evaluated.

#[cfg(feature = "trace")]
macro_rules! ring_trace {
    ($($arg:tt)*) => {
        log::trace!(target: "bytering", $($arg)*)
    };
}

#[cfg(not(feature = "trace"))]
macro_rules! ring_trace {
    ($($arg:tt)*) => {};
}
