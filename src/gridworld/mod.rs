use std::collections::{HashMap, HashSet};

use prettytable::{Cell as TableCell, Row, Table};

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    // Fixed enumeration order. Argmax scans and Q-table columns follow it.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::North => (0, 1),
            Direction::East => (1, 0),
            Direction::South => (0, -1),
            Direction::West => (-1, 0),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::East => "east",
            Direction::South => "south",
            Direction::West => "west",
        }
    }

    pub fn arrow(self) -> &'static str {
        match self {
            Direction::North => "↑",
            Direction::East => "→",
            Direction::South => "↓",
            Direction::West => "←",
        }
    }
}

// An immutable grid cell: coordinates plus the directions in which a
// neighbouring cell exists.
#[derive(Clone, Debug)]
pub struct Cell {
    x: i32,
    y: i32,
    moves: Vec<Direction>,
}

impl Cell {
    pub fn new(x: i32, y: i32, moves: &[Direction]) -> Cell {
        Cell {
            x: x,
            y: y,
            moves: moves.to_vec(),
        }
    }

    pub fn x(&self) -> i32 {
        self.x
    }

    pub fn y(&self) -> i32 {
        self.y
    }

    // Display name formed by concatenating the coordinates. Unique only
    // while coordinates stay single-digit; Grid::new asserts this.
    pub fn name(&self) -> String {
        format!("{}{}", self.x, self.y)
    }

    pub fn allows(&self, direction: Direction) -> bool {
        self.moves.contains(&direction)
    }

    pub fn neighbour(&self, direction: Direction) -> (i32, i32) {
        let (dx, dy) = direction.delta();
        (self.x + dx, self.y + dy)
    }
}

// An ordered collection of cells with an index built once at construction.
// Solvers address cells by index; names exist for display only.
#[derive(Clone, Debug)]
pub struct Grid {
    cells: Vec<Cell>,
    index: HashMap<(i32, i32), usize>,
    start: usize,
    terminal: usize,
    penalty: usize,
}

impl Grid {
    pub fn new(
        cells: Vec<Cell>,
        start: (i32, i32),
        terminal: (i32, i32),
        penalty: (i32, i32),
    ) -> Grid {
        let mut index = HashMap::new();
        let mut names = HashSet::new();
        for (i, cell) in cells.iter().enumerate() {
            let previous = index.insert((cell.x, cell.y), i);
            assert!(
                previous.is_none(),
                "Duplicate cell at ({}, {})",
                cell.x,
                cell.y
            );
            assert!(
                names.insert(cell.name()),
                "Cell name {} collides; coordinates must be single-digit",
                cell.name()
            );
        }

        let find = |(x, y): (i32, i32), role: &str| -> usize {
            *index
                .get(&(x, y))
                .unwrap_or_else(|| panic!("No {} cell at ({}, {})", role, x, y))
        };

        Grid {
            start: find(start, "start"),
            terminal: find(terminal, "terminal"),
            penalty: find(penalty, "penalty"),
            cells: cells,
            index: index,
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn cell(&self, index: usize) -> &Cell {
        &self.cells[index]
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn find(&self, x: i32, y: i32) -> Option<usize> {
        self.index.get(&(x, y)).copied()
    }

    // Lookup that must succeed: a miss means a malformed topology, and
    // there is no recovery path.
    pub fn index_of(&self, x: i32, y: i32) -> usize {
        self.find(x, y)
            .unwrap_or_else(|| panic!("No cell at ({}, {})", x, y))
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn terminal(&self) -> usize {
        self.terminal
    }

    pub fn penalty(&self) -> usize {
        self.penalty
    }

    pub fn names(&self) -> Vec<String> {
        self.cells.iter().map(|cell| cell.name()).collect()
    }
}

// The reference topology: cells (1..4)x(1..3) minus (2,2), start at (1,1),
// terminal at (4,3) with teleport back to start, penalty at (4,2).
pub fn new_reference_grid() -> Grid {
    use Direction::*;

    let descriptors: [(i32, i32, &[Direction]); 11] = [
        (1, 1, &[North, East]),
        (1, 2, &[North, South]),
        (1, 3, &[East, South]),
        (2, 1, &[East, West]),
        (2, 3, &[East, West]),
        (3, 1, &[North, East, West]),
        (3, 2, &[North, East, South]),
        (3, 3, &[East, South, West]),
        (4, 1, &[North, West]),
        (4, 2, &[North, South, West]),
        (4, 3, &[South, West]),
    ];

    let cells = descriptors
        .iter()
        .map(|&(x, y, moves)| Cell::new(x, y, moves))
        .collect();

    Grid::new(cells, (1, 1), (4, 3), (4, 2))
}

fn grid_bounds(grid: &Grid) -> (i32, i32, i32, i32) {
    let min_x = grid.cells().iter().map(|c| c.x()).min().unwrap();
    let max_x = grid.cells().iter().map(|c| c.x()).max().unwrap();
    let min_y = grid.cells().iter().map(|c| c.y()).min().unwrap();
    let max_y = grid.cells().iter().map(|c| c.y()).max().unwrap();
    (min_x, max_x, min_y, max_y)
}

pub fn print_grid_values(grid: &Grid, values: &[f64]) {
    let (min_x, max_x, min_y, max_y) = grid_bounds(grid);
    let mut table = Table::new();
    for y in (min_y..max_y + 1).rev() {
        let mut cells = Vec::new();
        for x in min_x..max_x + 1 {
            let text = match grid.find(x, y) {
                Some(index) => format!("{:.3}", values[index]),
                None => String::new(),
            };
            cells.push(TableCell::new(&text));
        }
        table.add_row(Row::new(cells));
    }
    table.printstd();
}

pub fn print_grid_policy(grid: &Grid, policy: &[Direction]) {
    let (min_x, max_x, min_y, max_y) = grid_bounds(grid);
    let mut table = Table::new();
    for y in (min_y..max_y + 1).rev() {
        let mut cells = Vec::new();
        for x in min_x..max_x + 1 {
            let symbol = match grid.find(x, y) {
                Some(index) => policy[index].arrow(),
                None => " ",
            };
            cells.push(TableCell::new(symbol));
        }
        table.add_row(Row::new(cells));
    }
    table.printstd();
}
