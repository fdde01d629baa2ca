//! Deterministic aggregate execution (no IO, no async).

/// Execute an aggregate command and evolve state in one step.
///
/// 1. **Decide**: calls `aggregate.handle(command)` to get events (pure).
/// 2. **Evolve**: applies each event via `aggregate.apply(event)`.
///
/// Useful in tests and for inline processing that does not need persistence
/// or publication. For the full pipeline (persistence, optimistic
/// concurrency, publication, side effects) use the executor in
/// `internlink-infra`.
pub fn execute<A>(aggregate: &mut A, command: &A::Command) -> Result<Vec<A::Event>, A::Error>
where
    A: internlink_core::Aggregate,
{
    let events = A::handle(aggregate, command)?;
    for ev in &events {
        A::apply(aggregate, ev);
    }
    Ok(events)
}
