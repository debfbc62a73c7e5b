use crate::geometry::{Point, Tile};

/// Sentinel tile index marking a cell as passable inside an obstacle layer.
/// Any other value at that cell blocks it.
pub const PASSABLE: i32 = -1;

/// Obstacle layer indexed `layer[x][y]`. Rows may be ragged; missing cells
/// are treated as passable.
pub type TileLayer = Vec<Vec<i32>>;

/// Read-only map oracle answering bounds and walkability queries.
pub trait MapOracle: Send + Sync {
    fn dimensions(&self) -> MapDimensions;

    /// True when the tile is inside the map and no obstacle layer blocks it.
    fn is_walkable(&self, tile: Tile) -> bool;

    fn contains(&self, tile: Tile) -> bool {
        self.dimensions().contains(tile)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MapDimensions {
    pub width: u32,
    pub height: u32,
}

impl MapDimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn contains(&self, tile: Tile) -> bool {
        tile.x >= 0
            && tile.y >= 0
            && tile.x < self.width as i32
            && tile.y < self.height as i32
    }

    /// Clamps a continuous position into `[0, width-1] x [0, height-1]`.
    pub fn clamp(&self, point: Point) -> Point {
        Point::new(
            point.x.clamp(0.0, (self.width.max(1) - 1) as f64),
            point.y.clamp(0.0, (self.height.max(1) - 1) as f64),
        )
    }
}

/// Concrete tile map backed by obstacle layers, the shape tile-map editors
/// export: a width/height in tiles, a square tile size in pixels, and zero
/// or more object layers where any non-sentinel cell blocks.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridMap {
    width: u32,
    height: u32,
    tile_dim: u32,
    layers: Vec<TileLayer>,
}

impl GridMap {
    pub fn new(width: u32, height: u32, tile_dim: u32, layers: Vec<TileLayer>) -> Self {
        Self {
            width,
            height,
            tile_dim,
            layers,
        }
    }

    /// An obstacle-free map. Every in-bounds tile is walkable.
    pub fn open(width: u32, height: u32) -> Self {
        Self::new(width, height, 32, Vec::new())
    }

    pub fn tile_dim(&self) -> u32 {
        self.tile_dim
    }

    /// Writes a blocking tile index into layer 0, growing storage as needed.
    /// Out-of-bounds tiles are ignored.
    pub fn block(&mut self, tile: Tile) {
        if !self.dimensions().contains(tile) {
            return;
        }
        if self.layers.is_empty() {
            self.layers.push(Vec::new());
        }
        let layer = &mut self.layers[0];
        let x = tile.x as usize;
        let y = tile.y as usize;
        if layer.len() <= x {
            layer.resize(x + 1, Vec::new());
        }
        if layer[x].len() <= y {
            layer[x].resize(y + 1, PASSABLE);
        }
        layer[x][y] = 0;
    }
}

impl MapOracle for GridMap {
    fn dimensions(&self) -> MapDimensions {
        MapDimensions::new(self.width, self.height)
    }

    fn is_walkable(&self, tile: Tile) -> bool {
        if !self.dimensions().contains(tile) {
            return false;
        }
        let x = tile.x as usize;
        let y = tile.y as usize;
        for layer in &self.layers {
            let blocked = layer
                .get(x)
                .and_then(|column| column.get(y))
                .is_some_and(|&index| index != PASSABLE);
            if blocked {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_bounds_is_never_walkable() {
        let map = GridMap::open(4, 4);
        assert!(!map.is_walkable(Tile::new(-1, 0)));
        assert!(!map.is_walkable(Tile::new(4, 0)));
        assert!(!map.is_walkable(Tile::new(0, 4)));
        assert!(map.is_walkable(Tile::new(3, 3)));
    }

    #[test]
    fn blocked_cells_come_from_any_layer() {
        let mut map = GridMap::open(4, 4);
        map.block(Tile::new(2, 1));
        assert!(!map.is_walkable(Tile::new(2, 1)));
        assert!(map.is_walkable(Tile::new(1, 2)));
    }

    #[test]
    fn ragged_layers_default_to_passable() {
        // Layer only covers column 0; everything else falls through.
        let layer: TileLayer = vec![vec![0]];
        let map = GridMap::new(4, 4, 32, vec![layer]);
        assert!(!map.is_walkable(Tile::new(0, 0)));
        assert!(map.is_walkable(Tile::new(0, 1)));
        assert!(map.is_walkable(Tile::new(3, 3)));
    }

    #[test]
    fn clamp_pins_to_dimension_minus_one() {
        let dims = MapDimensions::new(10, 8);
        let clamped = dims.clamp(Point::new(12.5, -3.0));
        assert_eq!(clamped, Point::new(9.0, 0.0));
    }
}
