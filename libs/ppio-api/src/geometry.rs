use std::fmt;
use std::str::FromStr;

/// A 2D coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
}

impl Coord {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Simple-features geometry, exchanged as WKT in tabular text formats.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Coord),
    LineString(Vec<Coord>),
    /// Exterior ring first, then holes.
    Polygon(Vec<Vec<Coord>>),
    MultiPoint(Vec<Coord>),
}

impl Geometry {
    pub fn point(x: f64, y: f64) -> Self {
        Geometry::Point(Coord::new(x, y))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "POINT",
            Geometry::LineString(_) => "LINESTRING",
            Geometry::Polygon(_) => "POLYGON",
            Geometry::MultiPoint(_) => "MULTIPOINT",
        }
    }

    /// Cheap check used by schema inference before a full parse.
    pub fn looks_like_wkt(s: &str) -> bool {
        let upper = s.trim_start().to_ascii_uppercase();
        ["POINT", "LINESTRING", "POLYGON", "MULTIPOINT"]
            .iter()
            .any(|t| upper.starts_with(t))
    }
}

fn write_coords(f: &mut fmt::Formatter<'_>, coords: &[Coord]) -> fmt::Result {
    f.write_str("(")?;
    for (i, c) in coords.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{} {}", c.x, c.y)?;
    }
    f.write_str(")")
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())?;
        f.write_str(" ")?;
        match self {
            Geometry::Point(c) => write!(f, "({} {})", c.x, c.y),
            Geometry::LineString(coords) | Geometry::MultiPoint(coords) => write_coords(f, coords),
            Geometry::Polygon(rings) => {
                f.write_str("(")?;
                for (i, ring) in rings.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write_coords(f, ring)?;
                }
                f.write_str(")")
            }
        }
    }
}

/// WKT parse failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WktError(pub String);

impl fmt::Display for WktError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid WKT: {}", self.0)
    }
}

impl std::error::Error for WktError {}

// ---- WKT reader ----

struct WktReader<'a> {
    rest: &'a str,
}

impl<'a> WktReader<'a> {
    fn skip_ws(&mut self) {
        self.rest = self.rest.trim_start();
    }

    fn eat(&mut self, ch: char) -> bool {
        self.skip_ws();
        if let Some(stripped) = self.rest.strip_prefix(ch) {
            self.rest = stripped;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, ch: char) -> Result<(), WktError> {
        if self.eat(ch) {
            Ok(())
        } else {
            Err(WktError(format!("expected '{ch}' at {:?}", self.rest)))
        }
    }

    fn word(&mut self) -> &'a str {
        self.skip_ws();
        let end = self
            .rest
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(self.rest.len());
        let (w, rest) = self.rest.split_at(end);
        self.rest = rest;
        w
    }

    fn number(&mut self) -> Result<f64, WktError> {
        self.skip_ws();
        let end = self
            .rest
            .find(|c: char| c.is_whitespace() || c == ',' || c == ')' || c == '(')
            .unwrap_or(self.rest.len());
        let (n, rest) = self.rest.split_at(end);
        let v = n
            .parse::<f64>()
            .map_err(|_| WktError(format!("bad coordinate {n:?}")))?;
        self.rest = rest;
        Ok(v)
    }

    fn coord(&mut self) -> Result<Coord, WktError> {
        let x = self.number()?;
        let y = self.number()?;
        Ok(Coord::new(x, y))
    }

    /// `(x y, x y, ...)`
    fn coord_list(&mut self) -> Result<Vec<Coord>, WktError> {
        self.expect('(')?;
        let mut coords = vec![self.coord()?];
        while self.eat(',') {
            coords.push(self.coord()?);
        }
        self.expect(')')?;
        Ok(coords)
    }

    /// MULTIPOINT accepts both `((1 2), (3 4))` and `(1 2, 3 4)`.
    fn multipoint(&mut self) -> Result<Vec<Coord>, WktError> {
        self.expect('(')?;
        let mut coords = Vec::new();
        loop {
            if self.eat('(') {
                coords.push(self.coord()?);
                self.expect(')')?;
            } else {
                coords.push(self.coord()?);
            }
            if !self.eat(',') {
                break;
            }
        }
        self.expect(')')?;
        Ok(coords)
    }

    fn polygon(&mut self) -> Result<Vec<Vec<Coord>>, WktError> {
        self.expect('(')?;
        let mut rings = vec![self.coord_list()?];
        while self.eat(',') {
            rings.push(self.coord_list()?);
        }
        self.expect(')')?;
        Ok(rings)
    }
}

impl FromStr for Geometry {
    type Err = WktError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut r = WktReader { rest: s };
        let tag = r.word().to_ascii_uppercase();
        let geometry = match tag.as_str() {
            "POINT" => {
                r.expect('(')?;
                let c = r.coord()?;
                r.expect(')')?;
                Geometry::Point(c)
            }
            "LINESTRING" => Geometry::LineString(r.coord_list()?),
            "POLYGON" => Geometry::Polygon(r.polygon()?),
            "MULTIPOINT" => Geometry::MultiPoint(r.multipoint()?),
            other => return Err(WktError(format!("unsupported geometry type {other:?}"))),
        };
        r.skip_ws();
        if !r.rest.is_empty() {
            return Err(WktError(format!("trailing input {:?}", r.rest)));
        }
        Ok(geometry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_text_is_stable() {
        let g = Geometry::point(-122.5, 37.25);
        assert_eq!(g.to_string(), "POINT (-122.5 37.25)");
        assert_eq!("point(-122.5   37.25)".parse::<Geometry>(), Ok(g));
    }

    #[test]
    fn polygon_with_hole() {
        let wkt = "POLYGON ((0 0, 10 0, 10 10, 0 0), (1 1, 2 1, 2 2, 1 1))";
        let g: Geometry = wkt.parse().unwrap();
        match &g {
            Geometry::Polygon(rings) => {
                assert_eq!(rings.len(), 2);
                assert_eq!(rings[1][2], Coord::new(2.0, 2.0));
            }
            other => panic!("expected polygon, got {other:?}"),
        }
        assert_eq!(g.to_string(), wkt);
    }

    #[test]
    fn multipoint_both_spellings() {
        let a: Geometry = "MULTIPOINT ((1 2), (3 4))".parse().unwrap();
        let b: Geometry = "MULTIPOINT (1 2, 3 4)".parse().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_garbage() {
        assert!("POINT (1)".parse::<Geometry>().is_err());
        assert!("CIRCLE (1 2)".parse::<Geometry>().is_err());
        assert!("POINT (1 2) extra".parse::<Geometry>().is_err());
        assert!(!Geometry::looks_like_wkt("hello"));
    }
}
