use std::collections::{HashMap, HashSet};

use crate::infra::{Bounds, Cell, SimError, WorldPos};

/// Static tile kinds stored in the grid. Fire lives in a separate layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tile {
    Empty,
    Wall,
    Exit,
}

/// What a cell looks like to the agent and the fire at this moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerrainClass {
    Empty,
    Wall,
    Fire,
    Exit,
}

/// Query surface the simulation core consumes. Walls and exits are static;
/// only the fire layer is ever written.
pub trait TerrainQuery {
    fn classify(&self, cell: Cell) -> TerrainClass;

    fn exits(&self) -> &[Cell];

    /// Marks `cell` as burning. Returns false if the cell cannot burn.
    fn set_fire(&mut self, cell: Cell) -> bool;

    fn clear_fire(&mut self);

    fn world_to_cell(&self, pos: WorldPos) -> Cell {
        Cell::new(pos.x.floor() as i32, pos.y.floor() as i32)
    }

    fn cell_to_world(&self, cell: Cell) -> WorldPos {
        WorldPos::new(cell.x as f32 + 0.5, cell.y as f32 + 0.5)
    }

    /// Exits are passable destinations; only walls block movement.
    fn is_passable(&self, cell: Cell) -> bool {
        self.classify(cell) != TerrainClass::Wall
    }

    fn is_fire(&self, cell: Cell) -> bool {
        self.classify(cell) == TerrainClass::Fire
    }
}

#[derive(Clone, Debug)]
pub struct TerrainGrid {
    pub width: i32,
    pub height: i32,
    tiles: HashMap<Cell, Tile>,
    exits: Vec<Cell>,
    fire: HashSet<Cell>,
}

impl TerrainGrid {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            tiles: HashMap::new(),
            exits: Vec::new(),
            fire: HashSet::new(),
        }
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::from_size(self.width, self.height)
    }

    pub fn in_bounds(&self, cell: &Cell) -> bool {
        self.bounds().contains(cell)
    }

    pub fn get(&self, cell: &Cell) -> Tile {
        self.tiles.get(cell).copied().unwrap_or(Tile::Empty)
    }

    pub fn insert(&mut self, cell: Cell, tile: Tile) -> Result<(), SimError> {
        if !self.in_bounds(&cell) {
            return Err(SimError::OutOfBounds {
                cell,
                width: self.width,
                height: self.height,
            });
        }

        self.exits.retain(|c| *c != cell);
        match tile {
            Tile::Empty => {
                self.tiles.remove(&cell);
            }
            Tile::Wall => {
                self.fire.remove(&cell);
                self.tiles.insert(cell, tile);
            }
            Tile::Exit => {
                self.fire.remove(&cell);
                self.tiles.insert(cell, tile);
                self.exits.push(cell);
                self.exits.sort();
            }
        }
        Ok(())
    }

    pub fn add_wall(&mut self, cell: Cell) -> Result<(), SimError> {
        self.insert(cell, Tile::Wall)
    }

    pub fn add_exit(&mut self, cell: Cell) -> Result<(), SimError> {
        self.insert(cell, Tile::Exit)
    }

    pub fn burning(&self) -> &HashSet<Cell> {
        &self.fire
    }

    pub fn burning_count(&self) -> usize {
        self.fire.len()
    }

    /// Renders the grid with ANSI colours. `@` is the agent, `H` the hostage.
    pub fn draw_ascii_map(&self, agent: Option<Cell>, hostage: Option<Cell>) -> String {
        let mut output = String::new();

        const RESET: &str = "\x1b[0m";
        const AGENT: &str = "\x1b[1;33m"; // Bright yellow
        const HOSTAGE: &str = "\x1b[1;36m"; // Bright cyan
        const WALL: &str = "\x1b[90m"; // Dark gray
        const EXIT: &str = "\x1b[1;32m"; // Bright green
        const FIRE: &str = "\x1b[1;31m"; // Bright red

        for y in 0..self.height {
            for x in 0..self.width {
                let cell = Cell::new(x, y);
                if Some(cell) == agent {
                    output.push_str(&format!("{}@{}", AGENT, RESET));
                } else if Some(cell) == hostage {
                    output.push_str(&format!("{}H{}", HOSTAGE, RESET));
                } else {
                    let tile_str = match self.classify(cell) {
                        TerrainClass::Wall => format!("{}█{}", WALL, RESET),
                        TerrainClass::Exit => format!("{}E{}", EXIT, RESET),
                        TerrainClass::Fire => format!("{}^{}", FIRE, RESET),
                        TerrainClass::Empty => ".".to_string(),
                    };
                    output.push_str(&tile_str);
                }
            }
            output.push('\n');
        }

        output
    }
}

impl TerrainQuery for TerrainGrid {
    fn classify(&self, cell: Cell) -> TerrainClass {
        if !self.in_bounds(&cell) {
            return TerrainClass::Wall;
        }
        match self.get(&cell) {
            Tile::Wall => TerrainClass::Wall,
            Tile::Exit => TerrainClass::Exit,
            Tile::Empty if self.fire.contains(&cell) => TerrainClass::Fire,
            Tile::Empty => TerrainClass::Empty,
        }
    }

    fn exits(&self) -> &[Cell] {
        &self.exits
    }

    fn set_fire(&mut self, cell: Cell) -> bool {
        match self.classify(cell) {
            TerrainClass::Wall | TerrainClass::Exit => false,
            TerrainClass::Fire => true,
            TerrainClass::Empty => self.fire.insert(cell),
        }
    }

    fn clear_fire(&mut self) {
        self.fire.clear();
    }
}

/// A parsed map: terrain plus the placement of the actors.
///
/// Layout characters: `.` empty, `#` wall, `E` exit, `H` hostage,
/// `A` agent start, `F` fire ignition. Rows map to `y`, columns to `x`.
#[derive(Clone, Debug)]
pub struct Layout {
    pub terrain: TerrainGrid,
    pub agent_start: Option<Cell>,
    pub hostage: Option<Cell>,
    pub ignition: Option<Cell>,
}

impl Layout {
    pub fn parse(text: &str) -> Result<Self, SimError> {
        let rows: Vec<&str> = text
            .lines()
            .map(str::trim_end)
            .filter(|l| !l.trim().is_empty())
            .collect();

        let height = rows.len() as i32;
        let width = rows.first().map(|r| r.chars().count()).unwrap_or(0) as i32;
        if height == 0 || width == 0 {
            return Err(SimError::Layout {
                line: 1,
                reason: "layout is empty".to_string(),
            });
        }

        let mut layout = Layout {
            terrain: TerrainGrid::new(width, height),
            agent_start: None,
            hostage: None,
            ignition: None,
        };

        for (y, row) in rows.iter().enumerate() {
            let len = row.chars().count() as i32;
            if len != width {
                return Err(SimError::Layout {
                    line: y + 1,
                    reason: format!("expected {} columns, found {}", width, len),
                });
            }

            for (x, ch) in row.chars().enumerate() {
                let cell = Cell::new(x as i32, y as i32);
                match ch {
                    '.' => {}
                    '#' => layout.terrain.add_wall(cell)?,
                    'E' => layout.terrain.add_exit(cell)?,
                    'H' => set_once(&mut layout.hostage, cell, "hostage", y)?,
                    'A' => set_once(&mut layout.agent_start, cell, "agent", y)?,
                    'F' => set_once(&mut layout.ignition, cell, "ignition", y)?,
                    other => {
                        return Err(SimError::Layout {
                            line: y + 1,
                            reason: format!("unknown tile {:?}", other),
                        });
                    }
                }
            }
        }

        Ok(layout)
    }
}

fn set_once(slot: &mut Option<Cell>, cell: Cell, what: &str, line: usize) -> Result<(), SimError> {
    if slot.is_some() {
        return Err(SimError::Layout {
            line: line + 1,
            reason: format!("more than one {} marker", what),
        });
    }
    *slot = Some(cell);
    Ok(())
}
