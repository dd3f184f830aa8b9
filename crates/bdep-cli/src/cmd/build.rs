//! build-deps command

use super::{Context, output};
use crate::BuildDepsArgs;
use anyhow::Result;
use bdep_core::{BuildClosureRequest, Resolver};

/// Resolve and print the build closure of source packages
pub async fn build_deps(ctx: &Context, args: &BuildDepsArgs, json: bool) -> Result<()> {
    let request = BuildClosureRequest {
        seeds: args.packages.clone(),
        scope: args.scope.to_request(),
        depth: args.depth,
        half_step: args.half_step,
        deadline: None,
        filters: args.filters.to_request(),
    };

    let result = Resolver::new(&ctx.universe, &ctx.config)
        .with_acl(&ctx.universe)
        .resolve_build_closure(&request)
        .await?;

    output::print(&result, json)
}
