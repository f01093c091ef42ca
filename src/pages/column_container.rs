//! Two-column layout of the search results page

use tracing::debug;

use super::base::PageBase;
use super::region::Region;
use crate::driver::Locator;
use crate::Result;

const ROOT: &str = ".column-container";
const MAIN_COLUMN: &str = ".column-main";
const SIDE_COLUMN: &str = ".column-strip";

/// Container width from which the columns sit side by side
pub const DESKTOP_BREAKPOINT: f64 = 768.0;

/// Rendering tolerance in CSS pixels
const TOLERANCE: f64 = 1.0;

#[derive(Debug, Clone)]
pub struct ColumnContainer {
    region: Region,
}

impl ColumnContainer {
    pub(crate) async fn locate(page: &PageBase) -> Result<Self> {
        Ok(Self {
            region: Region::locate(page, &Locator::css(ROOT)).await?,
        })
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    /// Side column left of the main column with equal tops on wide containers, stacked
    /// above it on narrow ones
    pub async fn is_expected_stacking(&self) -> Result<bool> {
        let container = self.region.root().rect().await?;
        let main = self.region.find_element(&Locator::css(MAIN_COLUMN)).await?.rect().await?;
        let side = self.region.find_element(&Locator::css(SIDE_COLUMN)).await?.rect().await?;
        debug!("Columns: container={:?} main={:?} side={:?}", container, main, side);

        let expected = if container.width >= DESKTOP_BREAKPOINT {
            (side.y - main.y).abs() <= TOLERANCE && side.right() <= main.x + TOLERANCE
        } else {
            side.bottom() <= main.y + TOLERANCE
        };
        Ok(expected)
    }
}
