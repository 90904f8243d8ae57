//! Spatial grid: positions, cells and orthogonal neighbourhoods.

use crate::agent::{Agent, AgentId};
use crate::error::GridError;
use crate::species::Role;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A grid coordinate. `x` indexes columns, `y` indexes rows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// One grid slot. Holds its occupants in insertion order and at most one producer.
#[derive(Clone, Debug)]
pub struct Cell {
    pos: Position,
    occupants: Vec<AgentId>,
    producer: Option<AgentId>,
}

impl Cell {
    fn new(pos: Position) -> Self {
        Self {
            pos,
            occupants: Vec::new(),
            producer: None,
        }
    }

    #[inline]
    pub fn position(&self) -> Position {
        self.pos
    }

    /// Occupant ids in the order they arrived.
    #[inline]
    pub fn occupants(&self) -> &[AgentId] {
        &self.occupants
    }

    #[inline]
    pub fn has_producer(&self) -> bool {
        self.producer.is_some()
    }

    /// The producer rooted in this cell, if any.
    #[inline]
    pub fn producer(&self) -> Option<AgentId> {
        self.producer
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.occupants.is_empty()
    }

    pub fn contains(&self, id: AgentId) -> bool {
        self.occupants.contains(&id)
    }

    fn admits(&self, role: Role) -> Result<(), GridError> {
        if role == Role::Producer && self.has_producer() {
            return Err(GridError::ProducerAlreadyPresent { pos: self.pos });
        }
        Ok(())
    }

    fn insert(&mut self, id: AgentId, role: Role) -> Result<(), GridError> {
        self.admits(role)?;
        if role == Role::Producer {
            self.producer = Some(id);
        }
        self.occupants.push(id);
        Ok(())
    }

    fn remove(&mut self, id: AgentId) -> Result<(), GridError> {
        let idx = self
            .occupants
            .iter()
            .position(|&o| o == id)
            .ok_or(GridError::AgentNotInCell { id, pos: self.pos })?;
        self.occupants.remove(idx);
        if self.producer == Some(id) {
            self.producer = None;
        }
        Ok(())
    }
}

/// Fixed-size `rows x cols` array of cells, stored row-major.
#[derive(Clone, Debug)]
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// Create an empty grid. Both dimensions must be non-zero.
    pub fn new(rows: usize, cols: usize) -> Result<Self, GridError> {
        if rows == 0 || cols == 0 || rows > i32::MAX as usize || cols > i32::MAX as usize {
            return Err(GridError::InvalidDimensions { rows, cols });
        }

        let mut cells = Vec::with_capacity(rows * cols);
        for y in 0..rows {
            for x in 0..cols {
                cells.push(Cell::new(Position::new(x as i32, y as i32)));
            }
        }

        Ok(Self { rows, cols, cells })
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Total number of cells
    #[inline]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as usize) < self.cols && (pos.y as usize) < self.rows
    }

    fn index(&self, pos: Position) -> Result<usize, GridError> {
        if !self.in_bounds(pos) {
            return Err(GridError::OutOfBounds {
                pos,
                rows: self.rows,
                cols: self.cols,
            });
        }
        Ok(pos.y as usize * self.cols + pos.x as usize)
    }

    /// Look up a cell. Positions outside the grid are an error, never clamped.
    pub fn get(&self, pos: Position) -> Result<&Cell, GridError> {
        let idx = self.index(pos)?;
        Ok(&self.cells[idx])
    }

    fn get_mut(&mut self, pos: Position) -> Result<&mut Cell, GridError> {
        let idx = self.index(pos)?;
        Ok(&mut self.cells[idx])
    }

    /// Iterate over every cell, row by row.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    /// Place `agent` in the cell at `pos` and update its position.
    ///
    /// Fails with [`GridError::ProducerAlreadyPresent`] when a second producer
    /// would share the cell; the agent is left untouched in that case.
    pub fn add_agent(&mut self, pos: Position, agent: &mut Agent) -> Result<(), GridError> {
        self.get_mut(pos)?.insert(agent.id(), agent.role())?;
        agent.set_position(pos);
        Ok(())
    }

    /// Remove the agent `id` from the cell at `pos`.
    pub fn remove_agent(&mut self, pos: Position, id: AgentId) -> Result<(), GridError> {
        self.get_mut(pos)?.remove(id)
    }

    /// Relocate `agent` from its current cell to the cell at `dest`.
    ///
    /// All checks run before anything is mutated, so a rejected move leaves
    /// both cells and the agent exactly as they were.
    pub fn move_agent(&mut self, agent: &mut Agent, dest: Position) -> Result<(), GridError> {
        let from = agent.position();
        let id = agent.id();
        if from == dest {
            return if self.get(from)?.contains(id) {
                Ok(())
            } else {
                Err(GridError::AgentNotInCell { id, pos: from })
            };
        }

        let src_idx = self.index(from)?;
        let dst_idx = self.index(dest)?;
        if !self.cells[src_idx].contains(id) {
            return Err(GridError::AgentNotInCell { id, pos: from });
        }
        self.cells[dst_idx].admits(agent.role())?;

        self.cells[src_idx].remove(id)?;
        self.cells[dst_idx].insert(id, agent.role())?;
        agent.set_position(dest);
        Ok(())
    }

    /// Pick one orthogonal neighbour of `pos`.
    ///
    /// A 1x1 grid returns `pos` itself. A single-row grid always steps along x,
    /// a single-column grid along y. A step that would leave the grid is
    /// reflected to the opposite direction, so exactly one coordinate changes
    /// by exactly one.
    pub fn random_adjacent_position<R: Rng + ?Sized>(
        &self,
        pos: Position,
        rng: &mut R,
    ) -> Result<Position, GridError> {
        self.index(pos)?;

        if self.rows == 1 && self.cols == 1 {
            return Ok(pos);
        }

        let along_x = if self.rows == 1 {
            true
        } else if self.cols == 1 {
            false
        } else {
            rng.gen_bool(0.5)
        };
        let step: i32 = if rng.gen_bool(0.5) { 1 } else { -1 };

        let (coord, limit) = if along_x {
            (pos.x, self.cols as i32)
        } else {
            (pos.y, self.rows as i32)
        };
        let mut next = coord + step;
        if next < 0 || next >= limit {
            next = coord - step;
        }

        Ok(if along_x {
            Position::new(next, pos.y)
        } else {
            Position::new(pos.x, next)
        })
    }

    /// Pick a uniformly random cell position.
    pub fn random_position<R: Rng + ?Sized>(&self, rng: &mut R) -> Position {
        let x = rng.gen_range(0..self.cols) as i32;
        let y = rng.gen_range(0..self.rows) as i32;
        Position::new(x, y)
    }

    /// Number of cells currently holding a producer
    pub fn producer_cells(&self) -> usize {
        self.cells.iter().filter(|c| c.has_producer()).count()
    }
}
