//! ESRI ASCII grid reader for the population raster.
//!
//! The grid is expected in WGS84 with cell sizes in decimal degrees; the
//! header carries the georeference and an optional nodata sentinel.

use std::fmt;
use std::fs;
use std::path::Path;

use geo::{Distance, Haversine, Point};

/// Meters per degree of latitude, used only to size the candidate cell
/// window before the exact haversine test.
const METERS_PER_DEGREE: f64 = 111_320.0;

#[derive(Debug, Clone)]
pub struct AsciiGrid {
    ncols: usize,
    nrows: usize,
    /// Lower-left corner of the grid, degrees.
    xll: f64,
    yll: f64,
    cellsize: f64,
    nodata: Option<f64>,
    /// Row-major, first row is the northernmost.
    values: Vec<f64>,
}

impl AsciiGrid {
    /// Parses an ESRI ASCII grid file.
    ///
    /// # Errors
    ///
    /// Returns [`RasterError`] if the file is unreadable or the header/body
    /// is malformed.
    pub fn open(path: &Path) -> Result<Self, RasterError> {
        let raw = fs::read_to_string(path).map_err(|source| RasterError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&raw)
    }

    fn parse(raw: &str) -> Result<Self, RasterError> {
        let mut ncols = None;
        let mut nrows = None;
        let mut xll = None;
        let mut yll = None;
        let mut xll_is_center = false;
        let mut yll_is_center = false;
        let mut cellsize = None;
        let mut nodata = None;

        let mut lines = raw.lines();
        let mut body_start: Option<String> = None;

        for line in lines.by_ref() {
            let mut parts = line.split_whitespace();
            let Some(keyword) = parts.next() else {
                continue;
            };
            let value = parts.next();
            match keyword.to_ascii_lowercase().as_str() {
                "ncols" => ncols = Some(parse_field(value, "ncols")?),
                "nrows" => nrows = Some(parse_field(value, "nrows")?),
                "xllcorner" => xll = Some(parse_field(value, "xllcorner")?),
                "yllcorner" => yll = Some(parse_field(value, "yllcorner")?),
                "xllcenter" => {
                    xll = Some(parse_field(value, "xllcenter")?);
                    xll_is_center = true;
                }
                "yllcenter" => {
                    yll = Some(parse_field(value, "yllcenter")?);
                    yll_is_center = true;
                }
                "cellsize" => cellsize = Some(parse_field(value, "cellsize")?),
                "nodata_value" => nodata = Some(parse_field(value, "nodata_value")?),
                // First non-header line starts the data block.
                _ => {
                    body_start = Some(line.to_string());
                    break;
                }
            }
        }

        let ncols = require_usize(ncols, "ncols")?;
        let nrows = require_usize(nrows, "nrows")?;
        let cellsize: f64 = cellsize.ok_or(RasterError::MissingField("cellsize"))?;
        let mut xll: f64 = xll.ok_or(RasterError::MissingField("xllcorner"))?;
        let mut yll: f64 = yll.ok_or(RasterError::MissingField("yllcorner"))?;
        if cellsize <= 0.0 {
            return Err(RasterError::MalformedField("cellsize"));
        }
        if xll_is_center {
            xll -= cellsize / 2.0;
        }
        if yll_is_center {
            yll -= cellsize / 2.0;
        }

        let mut values = Vec::with_capacity(ncols * nrows);
        if let Some(first) = body_start {
            push_row(&mut values, &first)?;
        }
        for line in lines {
            push_row(&mut values, line)?;
        }

        if values.len() != ncols * nrows {
            return Err(RasterError::CellCountMismatch {
                expected: ncols * nrows,
                actual: values.len(),
            });
        }

        Ok(Self {
            ncols,
            nrows,
            xll,
            yll,
            cellsize,
            nodata,
            values,
        })
    }

    fn cell_center(&self, row: usize, col: usize) -> (f64, f64) {
        let lat = self.yll + (self.nrows - row) as f64 * self.cellsize - self.cellsize / 2.0;
        let lon = self.xll + col as f64 * self.cellsize + self.cellsize / 2.0;
        (lat, lon)
    }

    fn is_nodata(&self, value: f64) -> bool {
        match self.nodata {
            Some(sentinel) => (value - sentinel).abs() < f64::EPSILON || !value.is_finite(),
            None => !value.is_finite(),
        }
    }

    /// Mean of all valid cell values whose centers lie within `radius_m`
    /// true ground meters of `(lat, lon)`. Returns `None` when the circle
    /// covers no valid cell.
    pub fn mean_within(&self, lat: f64, lon: f64, radius_m: f64) -> Option<f64> {
        let center = Point::new(lon, lat);

        // Candidate window in grid indices, padded by one cell.
        let dlat = radius_m / METERS_PER_DEGREE;
        let cos_lat = lat.to_radians().cos().abs().max(1e-6);
        let dlon = radius_m / (METERS_PER_DEGREE * cos_lat);

        let col_lo = ((lon - dlon - self.xll) / self.cellsize).floor().max(0.0) as usize;
        let col_hi = ((lon + dlon - self.xll) / self.cellsize).ceil().max(0.0) as usize;
        let top = self.yll + self.nrows as f64 * self.cellsize;
        let row_lo = ((top - (lat + dlat)) / self.cellsize).floor().max(0.0) as usize;
        let row_hi = ((top - (lat - dlat)) / self.cellsize).ceil().max(0.0) as usize;

        let mut sum = 0.0;
        let mut count = 0usize;
        for row in row_lo..row_hi.min(self.nrows) {
            for col in col_lo..col_hi.min(self.ncols) {
                let value = self.values[row * self.ncols + col];
                if self.is_nodata(value) {
                    continue;
                }
                let (cell_lat, cell_lon) = self.cell_center(row, col);
                let distance = Haversine.distance(center, Point::new(cell_lon, cell_lat));
                if distance <= radius_m {
                    sum += value;
                    count += 1;
                }
            }
        }

        if count == 0 {
            None
        } else {
            Some(sum / count as f64)
        }
    }
}

fn parse_field<T: std::str::FromStr>(
    value: Option<&str>,
    field: &'static str,
) -> Result<T, RasterError> {
    value
        .and_then(|v| v.parse().ok())
        .ok_or(RasterError::MalformedField(field))
}

fn require_usize(value: Option<usize>, field: &'static str) -> Result<usize, RasterError> {
    match value {
        Some(v) if v > 0 => Ok(v),
        Some(_) => Err(RasterError::MalformedField(field)),
        None => Err(RasterError::MissingField(field)),
    }
}

fn push_row(values: &mut Vec<f64>, line: &str) -> Result<(), RasterError> {
    for token in line.split_whitespace() {
        let value: f64 = token
            .parse()
            .map_err(|_| RasterError::MalformedField("data"))?;
        values.push(value);
    }
    Ok(())
}

#[derive(Debug)]
pub enum RasterError {
    Io { path: String, source: std::io::Error },
    MissingField(&'static str),
    MalformedField(&'static str),
    CellCountMismatch { expected: usize, actual: usize },
}

impl fmt::Display for RasterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RasterError::Io { path, .. } => write!(f, "unable to read raster file {path}"),
            RasterError::MissingField(field) => write!(f, "raster header is missing {field}"),
            RasterError::MalformedField(field) => write!(f, "raster field {field} is malformed"),
            RasterError::CellCountMismatch { expected, actual } => {
                write!(f, "raster body has {actual} cells, header promises {expected}")
            }
        }
    }
}

impl std::error::Error for RasterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RasterError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}
