use geo::{Coord, MapCoords, MultiPolygon};
use proj4rs::{proj::Proj as Proj4, transform::transform};

use tracing::warn;

use crate::error::{Error, Result};
use crate::layer::{SourceLayer, TargetLayer};

/// Lambert conformal conic grid on a 6370997 m sphere, the working projection of the InMAP
/// modeling grid that reaggregated inventories are usually headed for.
pub const INMAP_GRID_PROJ4: &str =
    "+proj=lcc +lat_1=33 +lat_2=45 +lat_0=40 +lon_0=-97 +x_0=0 +y_0=0 +a=6370997 +b=6370997 +units=m +no_defs";

/// ESRI WKT of [`INMAP_GRID_PROJ4`], written as the `.prj` of layers reprojected onto the grid.
pub const INMAP_GRID_WKT: &str = concat!(
    r#"PROJCS["Lambert_Conformal_Conic",GEOGCS["GCS_unnamed ellipse",DATUM["D_unknown","#,
    r#"SPHEROID["Unknown",6370997,0]],PRIMEM["Greenwich",0],UNIT["Degree",0.017453292519943295]],"#,
    r#"PROJECTION["Lambert_Conformal_Conic"],PARAMETER["standard_parallel_1",33],"#,
    r#"PARAMETER["standard_parallel_2",45],PARAMETER["latitude_of_origin",40],"#,
    r#"PARAMETER["central_meridian",-97],PARAMETER["false_easting",0],"#,
    r#"PARAMETER["false_northing",0],UNIT["Meter",1]]"#,
);

/// `.prj` text for PROJ.4 systems this crate knows the WKT of.
fn known_wkt(proj_string: &str) -> Option<&'static str> {
    let tokens = |s: &str| s.split_whitespace().map(str::to_owned).collect::<Vec<_>>();
    (tokens(proj_string) == tokens(INMAP_GRID_PROJ4)).then_some(INMAP_GRID_WKT)
}

/// Transforms geometries between two PROJ.4 coordinate systems.
///
/// Geographic systems (`+proj=longlat`/`+proj=latlong`) take and produce degrees; the
/// radian conversion proj4rs expects happens inside.
pub struct Reprojector {
    from: Proj4,
    to: Proj4,
    from_degrees: bool,
    to_degrees: bool,
    /// `.prj` text of the destination system, when known.
    to_prj: Option<String>,
}

impl std::fmt::Debug for Reprojector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reprojector")
            .field("from_degrees", &self.from_degrees)
            .field("to_degrees", &self.to_degrees)
            .field("to_prj", &self.to_prj.is_some())
            .finish_non_exhaustive()
    }
}

/// True when a PROJ.4 string describes a geographic (angular) system.
fn is_geographic(proj_string: &str) -> bool {
    proj_string.split_whitespace()
        .any(|token| matches!(token, "+proj=longlat" | "+proj=latlong" | "+proj=lonlat" | "+proj=latlon"))
}

fn parse(proj_string: &str) -> Result<Proj4> {
    Proj4::from_proj_string(proj_string)
        .map_err(|e| Error::Projection { message: format!("failed to parse PROJ.4 {proj_string:?}: {e:?}") })
}

impl Reprojector {
    pub fn new(from: &str, to: &str) -> Result<Self> {
        Ok(Self {
            from: parse(from)?,
            to: parse(to)?,
            from_degrees: is_geographic(from),
            to_degrees: is_geographic(to),
            to_prj: known_wkt(to).map(str::to_owned),
        })
    }

    /// Set the `.prj` text recorded on layers reprojected by this reprojector.
    pub fn with_target_prj(mut self, wkt: impl Into<String>) -> Self {
        self.to_prj = Some(wkt.into());
        self
    }

    /// `.prj` text of the destination system, if known.
    #[inline] pub fn target_prj(&self) -> Option<&str> { self.to_prj.as_deref() }

    /// Transform a single coordinate.
    pub fn coord(&self, coord: Coord<f64>) -> Result<Coord<f64>> {
        let mut point = if self.from_degrees {
            (coord.x.to_radians(), coord.y.to_radians(), 0.0)
        } else {
            (coord.x, coord.y, 0.0)
        };
        transform(&self.from, &self.to, &mut point)
            .map_err(|e| Error::Projection {
                message: format!("failed to transform ({}, {}): {e:?}", coord.x, coord.y),
            })?;

        Ok(if self.to_degrees {
            Coord { x: point.0.to_degrees(), y: point.1.to_degrees() }
        } else {
            Coord { x: point.0, y: point.1 }
        })
    }

    /// Transform every vertex of a polygon set.
    pub fn reproject(&self, shape: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>> {
        shape.try_map_coords(|coord| self.coord(coord))
    }
}

impl SourceLayer {
    /// Reproject all source geometries in place; `.prj` becomes the destination's.
    pub fn reproject(&mut self, reprojector: &Reprojector) -> Result<()> {
        for record in &mut self.records {
            record.geometry = reprojector.reproject(&record.geometry)?;
        }
        self.prj = reprojector.target_prj().map(str::to_owned);
        Ok(())
    }
}

impl TargetLayer {
    /// Reproject all target geometries in place; `.prj` becomes the destination's.
    pub fn reproject(&mut self, reprojector: &Reprojector) -> Result<()> {
        for record in &mut self.records {
            record.geometry = reprojector.reproject(&record.geometry)?;
        }
        self.prj = reprojector.target_prj().map(str::to_owned);
        if self.prj.is_none() {
            warn!("no .prj text known for the working system; output will carry none (set projection.working_prj)");
        }
        Ok(())
    }
}
