//! Typed domain separators for canonical hashing.
//!
//! Every digest computed in the workspace selects a domain via
//! [`HashDomain`]; this module is the only place the separator byte strings
//! are spelled out. The enum, `as_bytes()`, `ALL` and `Display` are generated
//! from one macro invocation so they cannot drift apart.

/// Declares `HashDomain` enum, `as_bytes()`, `ALL`, and `Display` from one list.
macro_rules! define_hash_domains {
    (
        $(
            $(#[$meta:meta])*
            $variant:ident => $bytes:expr
        ),+ $(,)?
    ) => {
        /// Typed domain separator for [`super::hash::canonical_hash`].
        ///
        /// Every variant maps to a unique, null-terminated byte string used as
        /// a SHA-256 prefix.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum HashDomain {
            $(
                $(#[$meta])*
                $variant,
            )+
        }

        impl HashDomain {
            /// The raw domain-separator bytes (null-terminated).
            #[must_use]
            pub const fn as_bytes(&self) -> &'static [u8] {
                match self {
                    $( Self::$variant => $bytes, )+
                }
            }

            /// All domain variants in declaration order.
            pub const ALL: &[HashDomain] = &[
                $( Self::$variant, )+
            ];
        }

        impl core::fmt::Display for HashDomain {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                match self {
                    $( Self::$variant => write!(f, stringify!($variant)), )+
                }
            }
        }
    };
}

define_hash_domains! {
    // -----------------------------------------------------------------------
    // Search
    // -----------------------------------------------------------------------

    /// `SearchReport` canonical JSON.
    SearchReport => b"SYNTHPLAN::SEARCH_REPORT::V1\0",

    /// Extracted synthesis route.
    SynthesisRoute => b"SYNTHPLAN::SYNTHESIS_ROUTE::V1\0",

    /// Tree configuration echo.
    TreeConfig => b"SYNTHPLAN::TREE_CONFIG::V1\0",

    /// Search policy echo.
    SearchPolicy => b"SYNTHPLAN::SEARCH_POLICY::V1\0",

    // -----------------------------------------------------------------------
    // Harness
    // -----------------------------------------------------------------------

    /// Scenario fixture content.
    ScenarioFixture => b"SYNTHPLAN::SCENARIO_FIXTURE::V1\0",

    /// Artifact file content.
    Artifact => b"SYNTHPLAN::ARTIFACT::V1\0",

    // -----------------------------------------------------------------------
    // Benchmarks
    // -----------------------------------------------------------------------

    /// Benchmark determinism guard.
    BenchGuard => b"SYNTHPLAN::BENCH_GUARD::V1\0",
}
