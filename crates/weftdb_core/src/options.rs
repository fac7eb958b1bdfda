//! Per-call option flags.

bitflags::bitflags! {
    /// Option bits accepted by every batched operation.
    ///
    /// Flags that make no sense for a given operation are ignored there, so a
    /// caller may thread one set through a whole request pipeline.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Options: u32 {
        /// Flush affected collections to disk before returning. Honored by
        /// head writes and transaction commits; a no-op without a configured
        /// directory.
        const WRITE_FLUSH = 1 << 1;
        /// Suppress read tracking inside a transaction. Untracked reads are
        /// invisible to commit-time validation.
        const DONT_WATCH = 1 << 2;
        /// Do not reset the arena at operation entry, so outputs of the
        /// previous operation on the same arena stay valid.
        const DONT_DISCARD_MEMORY = 1 << 4;
        /// Request outputs in shared memory. The core treats this as a hint;
        /// collaborator transports give it meaning.
        const SHARED_MEMORY = 1 << 5;
        /// Relax scan ordering guarantees. Output may then contain duplicate
        /// or unordered keys; callers opting in must not depend on either.
        const SCAN_BULK = 1 << 6;
    }
}
