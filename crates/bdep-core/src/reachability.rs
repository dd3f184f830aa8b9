//! Unbounded reachability over binary provide/require matching.
//!
//! Seeds may name sources or binaries. Everything discovered afterwards is a
//! binary and contributes only its own requirements.

use crate::closure::Closure;
use crate::error::Result;
use crate::session::Session;
use crate::universe::NameKind;
use bdep_schema::PackageName;
use std::collections::BTreeSet;

/// Grow `seeds` until no requirement of a member has an unseen provider.
///
/// Only the packages added in the previous round are queried; older members
/// were already asked and their answers cannot change within a snapshot.
/// Each round adds at least one package, so the loop ends after at most
/// as many rounds as the universe has packages.
pub(crate) async fn expand(session: &Session<'_>, seeds: BTreeSet<PackageName>) -> Result<Closure> {
    let mut closure = Closure::from_seeds(seeds);
    let mut frontier = closure.seeds().clone();
    let mut level = 1;
    let mut kind = NameKind::Any;

    while !frontier.is_empty() {
        level += 1;
        frontier = closure.step(session, &frontier, kind, false, level).await?;
        kind = NameKind::Binary;
        tracing::debug!("Round {}: {} new packages", level - 1, frontier.len());
    }

    tracing::debug!(
        "Fixed point after {} rounds, {} packages",
        level - 1,
        closure.len()
    );
    Ok(closure)
}
