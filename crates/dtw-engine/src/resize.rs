//! Content-aware resizing: repeated seam search and removal.
//!
//! All vertical seams are removed first (width reduction), then all
//! horizontal seams (height reduction). Each removal is a complete
//! search-then-splice step on the current grid, so later seams see the
//! energies left behind by earlier ones.

use crate::carve;
use crate::diagnostics::{Clock, PhaseDiagnostics, ResizeDiagnostics, ResizeSummary};
use crate::grid::PixelGrid;
use crate::seam::{self, Direction};
use crate::types::{Dimensions, EngineConfig, EngineError, EnlargementPolicy, MIN_DIMENSION};

/// Work out the size a resize will actually reach.
///
/// # Errors
///
/// Returns [`EngineError::InvalidDimensions`] if `requested` is below
/// [`MIN_DIMENSION`] in either axis, and
/// [`EngineError::UnsupportedEnlargement`] if it exceeds `current` while
/// `policy` is [`EnlargementPolicy::Reject`].
pub fn plan_target(
    current: Dimensions,
    requested: Dimensions,
    policy: EnlargementPolicy,
) -> Result<Dimensions, EngineError> {
    if !requested.is_supported() {
        return Err(EngineError::InvalidDimensions {
            width: requested.width,
            height: requested.height,
            minimum: MIN_DIMENSION,
        });
    }

    let enlarges = requested.width > current.width || requested.height > current.height;
    if !enlarges {
        return Ok(requested);
    }
    match policy {
        EnlargementPolicy::Reject => Err(EngineError::UnsupportedEnlargement { current, requested }),
        EnlargementPolicy::Ignore => {
            log::warn!(
                "cannot enlarge {current} to {requested}; oversize dimensions are left unchanged"
            );
            Ok(Dimensions::new(
                requested.width.min(current.width),
                requested.height.min(current.height),
            ))
        }
    }
}

/// Remove `count` seams in `direction`, recording them in `phase`.
fn carve_phase<C: Clock>(
    grid: &mut PixelGrid,
    direction: Direction,
    count: u32,
    validate: bool,
    clock: &C,
) -> Result<PhaseDiagnostics, EngineError> {
    let mut phase = PhaseDiagnostics::new(direction);
    let start = clock.now();
    for _ in 0..count {
        let found = seam::find_seam(grid, direction)?;
        carve::remove_seam(grid, &found, validate)?;
        if validate {
            grid.check_consistency()?;
        }
        phase.record(found.total_energy());
    }
    phase.duration = clock.elapsed(&start);
    Ok(phase)
}

/// Shrink `grid` to `requested` by removing seams.
///
/// On error the grid may already have lost some seams; every seam that
/// was removed was removed completely.
///
/// # Errors
///
/// See [`plan_target`] for the up-front checks. Seam search and removal
/// can additionally return [`EngineError::CorruptTopology`].
pub fn resize<C: Clock>(
    grid: &mut PixelGrid,
    requested: Dimensions,
    config: &EngineConfig,
    clock: &C,
) -> Result<ResizeDiagnostics, EngineError> {
    let source = grid.dimensions();
    let target = plan_target(source, requested, config.enlargement)?;
    let validate = config.validate_topology;

    let total_start = clock.now();
    let vertical = carve_phase(
        grid,
        Direction::Vertical,
        source.width - target.width,
        validate,
        clock,
    )?;
    let horizontal = carve_phase(
        grid,
        Direction::Horizontal,
        source.height - target.height,
        validate,
        clock,
    )?;
    let total_duration = clock.elapsed(&total_start);

    let result = grid.dimensions();
    log::info!(
        "resized {source} to {result}: {} vertical and {} horizontal seams",
        vertical.seams_removed,
        horizontal.seams_removed,
    );

    Ok(ResizeDiagnostics {
        vertical,
        horizontal,
        total_duration,
        summary: ResizeSummary {
            source,
            requested,
            result,
        },
    })
}
