//! Sample projects compiled into this crate. Shared by the build script and
//! the regeneration test.

/// Banner timestamp of the compiled output.
pub const TIMESTAMP: &str = "2026-01-01 00:00:00 UTC";

pub struct Fixture {
    /// Module the output is mounted as.
    pub module: &'static str,
    /// Paths relative to this crate's manifest.
    pub schema: &'static str,
    pub options: Option<&'static str>,
}

pub const FIXTURES: &[Fixture] = &[
    Fixture {
        module: "orders",
        schema: "../schema/orders.json",
        options: Some("../schema/stubgen.toml"),
    },
    Fixture {
        module: "keywords",
        schema: "../schema/keywords.json",
        options: None,
    },
];
