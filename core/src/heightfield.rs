use glam::{Vec2, Vec3};

// One interleaved vertex as uploaded by the renderer: [v, vn, (s,t)]
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainVertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub tex_coord: Vec2,
}

// resolution x resolution samples, row-major, spanning world_size in local x/z.
// Normals, vertices and min/max are derived; elevations only change through edit().
#[derive(Debug, Clone)]
pub struct HeightField {
    resolution: usize,
    world_size: f32,
    elevations: Vec<f32>,
    normals: Vec<Vec3>,
    tex_coords: Vec<Vec2>,
    vertices: Vec<TerrainVertex>,
    indices: Vec<u32>,
    min_height: f32,
    max_height: f32,
}

impl HeightField {
    pub fn new(resolution: usize, world_size: f32) -> Self {
        assert!(resolution >= 2, "resolution must be at least 2");

        let count = resolution * resolution;
        let last = (resolution - 1) as f32;

        let mut tex_coords = Vec::with_capacity(count);
        for i in 0..resolution {
            for j in 0..resolution {
                tex_coords.push(Vec2::new(j as f32 / last, i as f32 / last));
            }
        }

        // Two triangles per quad, same winding everywhere
        let mut indices = Vec::with_capacity((resolution - 1) * (resolution - 1) * 6);
        let n = resolution as u32;
        for gz in 0..n - 1 {
            for gx in 0..n - 1 {
                let top_left = gz * n + gx;
                let top_right = top_left + 1;
                let bottom_left = (gz + 1) * n + gx;
                let bottom_right = bottom_left + 1;
                indices.extend_from_slice(&[
                    top_left,
                    bottom_left,
                    top_right,
                    top_right,
                    bottom_left,
                    bottom_right,
                ]);
            }
        }

        let mut field = Self {
            resolution,
            world_size,
            elevations: vec![0.0; count],
            normals: vec![Vec3::Y; count],
            tex_coords,
            vertices: Vec::with_capacity(count),
            indices,
            min_height: 0.0,
            max_height: 0.0,
        };
        field.rebuild_vertices();
        field
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    pub fn world_size(&self) -> f32 {
        self.world_size
    }

    // World distance between two adjacent samples
    pub fn spacing(&self) -> f32 {
        self.world_size / (self.resolution - 1) as f32
    }

    // Outside [0, resolution) reads as 0
    pub fn sample_elevation(&self, col: isize, row: isize) -> f32 {
        match self.index_of(col, row) {
            Some(i) => self.elevations[i],
            None => 0.0,
        }
    }

    fn index_of(&self, col: isize, row: isize) -> Option<usize> {
        let n = self.resolution as isize;
        if col < 0 || row < 0 || col >= n || row >= n {
            return None;
        }
        Some(row as usize * self.resolution + col as usize)
    }

    // Bilinear, local coords clamped to the tile
    pub fn height_at(&self, local_x: f32, local_z: f32) -> f32 {
        let last = (self.resolution - 1) as f32;
        let gx = (local_x / self.spacing()).clamp(0.0, last);
        let gz = (local_z / self.spacing()).clamp(0.0, last);

        let x0 = (gx.floor() as usize).min(self.resolution - 2);
        let z0 = (gz.floor() as usize).min(self.resolution - 2);
        let tx = gx - x0 as f32;
        let tz = gz - z0 as f32;

        let n = self.resolution;
        let a = self.elevations[z0 * n + x0];
        let b = self.elevations[z0 * n + x0 + 1];
        let c = self.elevations[(z0 + 1) * n + x0];
        let d = self.elevations[(z0 + 1) * n + x0 + 1];

        let ab = a * (1.0 - tx) + b * tx;
        let cd = c * (1.0 - tx) + d * tx;
        ab * (1.0 - tz) + cd * tz
    }

    pub fn elevations(&self) -> &[f32] {
        &self.elevations
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn tex_coords(&self) -> &[Vec2] {
        &self.tex_coords
    }

    pub fn vertices(&self) -> &[TerrainVertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn min_max(&self) -> (f32, f32) {
        (self.min_height, self.max_height)
    }

    // Elevations along one row, left to right
    pub fn row(&self, row: usize) -> &[f32] {
        let start = row * self.resolution;
        &self.elevations[start..start + self.resolution]
    }

    // Elevations down one column, top to bottom
    pub fn column(&self, col: usize) -> Vec<f32> {
        (0..self.resolution)
            .map(|row| self.elevations[row * self.resolution + col])
            .collect()
    }

    // Derived data is rebuilt once, when the guard drops
    pub fn edit(&mut self) -> HeightEdit<'_> {
        HeightEdit { field: self }
    }

    // Symmetric finite differences through the edge-safe sampler
    fn recompute_normals(&mut self) {
        let d = self.spacing();
        let n = self.resolution;
        for row in 0..n {
            for col in 0..n {
                let (c, r) = (col as isize, row as isize);
                let tx = Vec3::new(
                    2.0 * d,
                    self.sample_elevation(c + 1, r) - self.sample_elevation(c - 1, r),
                    0.0,
                );
                let tz = Vec3::new(
                    0.0,
                    self.sample_elevation(c, r + 1) - self.sample_elevation(c, r - 1),
                    2.0 * d,
                );
                self.normals[row * n + col] = tz.cross(tx).normalize();
            }
        }
    }

    fn recompute_min_max(&mut self) {
        let mut min = f32::MAX;
        let mut max = f32::MIN;
        for &h in &self.elevations {
            min = min.min(h);
            max = max.max(h);
        }
        self.min_height = min;
        self.max_height = max;
    }

    fn rebuild_vertices(&mut self) {
        let n = self.resolution;
        let last = (n - 1) as f32;
        self.vertices.clear();
        for i in 0..n {
            for j in 0..n {
                let idx = i * n + j;
                self.vertices.push(TerrainVertex {
                    position: Vec3::new(
                        j as f32 / last * self.world_size,
                        self.elevations[idx],
                        i as f32 / last * self.world_size,
                    ),
                    normal: self.normals[idx],
                    tex_coord: self.tex_coords[idx],
                });
            }
        }
    }

    fn refresh(&mut self) {
        self.recompute_normals();
        self.recompute_min_max();
        self.rebuild_vertices();
    }
}

// Write access to the elevations; drop refreshes everything derived
pub struct HeightEdit<'a> {
    field: &'a mut HeightField,
}

impl HeightEdit<'_> {
    pub fn resolution(&self) -> usize {
        self.field.resolution
    }

    pub fn get(&self, col: isize, row: isize) -> f32 {
        self.field.sample_elevation(col, row)
    }

    // false when off the grid
    pub fn set(&mut self, col: isize, row: isize, value: f32) -> bool {
        match self.field.index_of(col, row) {
            Some(i) => {
                self.field.elevations[i] = value;
                true
            }
            None => false,
        }
    }

    // Calls `f(col, row)` once per sample and stores the result
    pub fn fill_with(&mut self, mut f: impl FnMut(usize, usize) -> f32) {
        let n = self.field.resolution;
        for row in 0..n {
            for col in 0..n {
                self.field.elevations[row * n + col] = f(col, row);
            }
        }
    }
}

impl Drop for HeightEdit<'_> {
    fn drop(&mut self) {
        self.field.refresh();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_layout() {
        let f = HeightField::new(5, 100.0);
        assert_eq!(f.elevations().len(), 25);
        assert_eq!(f.indices().len(), 4 * 4 * 6);
        assert_eq!(f.vertices()[24].position, Vec3::new(100.0, 0.0, 100.0));
        assert_eq!(f.vertices()[1].position, Vec3::new(25.0, 0.0, 0.0));
        assert_eq!(f.tex_coords()[5], Vec2::new(0.0, 0.25));
        assert!(f.normals().iter().all(|&n| n == Vec3::Y));
        assert_eq!(f.min_max(), (0.0, 0.0));
    }

    #[test]
    fn quads_share_winding() {
        let f = HeightField::new(4, 3.0);
        let v = f.vertices();
        // cross product of every triangle points up on a flat grid
        for tri in f.indices().chunks(3) {
            let (a, b, c) = (
                v[tri[0] as usize].position,
                v[tri[1] as usize].position,
                v[tri[2] as usize].position,
            );
            assert!((b - a).cross(c - a).y > 0.0);
        }
    }

    #[test]
    fn out_of_range_samples_are_zero() {
        let mut f = HeightField::new(3, 2.0);
        f.edit().fill_with(|_, _| 7.0);
        for &(c, r) in &[(-1, 0), (0, -1), (3, 0), (0, 3), (isize::MIN, isize::MAX)] {
            assert_eq!(f.sample_elevation(c, r), 0.0);
        }
        assert_eq!(f.sample_elevation(2, 2), 7.0);
    }

    #[test]
    fn edit_refreshes_derived_data() {
        let mut f = HeightField::new(5, 4.0);
        {
            let mut e = f.edit();
            assert!(e.set(2, 2, 3.0));
            assert!(!e.set(5, 0, 1.0));
            assert!(!e.set(-1, 0, 1.0));
        }
        assert_eq!(f.min_max(), (0.0, 3.0));
        assert_eq!(f.vertices()[12].position.y, 3.0);
        // left of the peak the surface rises toward +x, so the normal leans -x
        assert!(f.normals()[11].x < 0.0);
        assert!(f.normals()[13].x > 0.0);
        assert!(f.normals()[7].z < 0.0);
        assert!((f.normals()[11].length() - 1.0).abs() < 1e-5);
        assert_eq!(f.vertices()[11].normal, f.normals()[11]);
    }

    #[test]
    fn slope_normal() {
        let mut f = HeightField::new(3, 2.0);
        // rises one unit per unit of x
        f.edit().fill_with(|col, _| col as f32);
        let n = f.normals()[4];
        let expected = Vec3::new(-1.0, 1.0, 0.0).normalize();
        assert!((n - expected).length() < 1e-5);
    }

    #[test]
    fn bilinear_height() {
        let mut f = HeightField::new(2, 10.0);
        {
            let mut e = f.edit();
            e.set(1, 0, 10.0);
            e.set(1, 1, 10.0);
        }
        assert_eq!(f.height_at(0.0, 0.0), 0.0);
        assert_eq!(f.height_at(5.0, 3.0), 5.0);
        assert_eq!(f.height_at(10.0, 10.0), 10.0);
        assert_eq!(f.height_at(20.0, 0.0), 10.0);
    }
}
