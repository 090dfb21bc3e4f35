//! Format layer creation macros

/// Text layer (`pretty` or `compact`) with the shared display options.
macro_rules! create_fmt_layer {
    ($format:ident, $display:expr, $writer:expr) => {{
        tracing_subscriber::fmt::layer()
            .$format()
            .with_writer($writer)
            .with_ansi($display.colors)
            .with_target($display.target)
            .with_file($display.source)
            .with_line_number($display.source)
    }};
}

/// JSON layer; events carry the current span.
macro_rules! create_json_layer {
    ($display:expr, $writer:expr) => {{
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer($writer)
            .with_current_span(true)
            .with_span_list(false)
            .flatten_event($display.flatten)
            .with_ansi(false)
            .with_target($display.target)
            .with_file($display.source)
            .with_line_number($display.source)
    }};
}

/// Attach `$layer` to a filtered registry, dropping timestamps when
/// `$display.time` is off, and install it globally.
macro_rules! init_subscriber {
    ($filter:expr, $layer:expr, $display:expr) => {{
        if $display.time {
            Registry::default().with($filter).with($layer).try_init()
        } else {
            Registry::default()
                .with($filter)
                .with($layer.without_time())
                .try_init()
        }
    }};
}
