//! full-deps command

use super::{Context, output};
use crate::FullDepsArgs;
use anyhow::Result;
use bdep_core::{FullClosureRequest, Resolver};

/// Resolve and print everything the packages transitively require
pub async fn full_deps(ctx: &Context, args: &FullDepsArgs, json: bool) -> Result<()> {
    let request = FullClosureRequest {
        seeds: args.packages.clone(),
        scope: args.scope.to_request(),
        deadline: None,
        filters: args.filters.to_request(),
    };

    let result = Resolver::new(&ctx.universe, &ctx.config)
        .with_acl(&ctx.universe)
        .resolve_full_closure(&request)
        .await?;

    output::print(&result, json)
}
