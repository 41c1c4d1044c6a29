//! Determinant-based orientation and in-sphere predicates, generalized to
//! arbitrary dimension. These are plain floating-point determinants rather
//! than exact arithmetic: the kernel does not promise exactness (see the
//! Non-goals), only a best-effort numeric answer, which keeps the
//! implementation uniform across dimensions instead of specialized per-D.

use crate::point::Point;

/// Determinant of a square matrix via partial-pivot Gaussian elimination.
fn determinant(mut matrix: Vec<Vec<f64>>) -> f64 {
	let n = matrix.len();
	let mut sign = 1.0;
	for col in 0..n {
		let mut pivot_row = col;
		let mut pivot_val = matrix[col][col].abs();
		for row in (col + 1)..n {
			if matrix[row][col].abs() > pivot_val {
				pivot_row = row;
				pivot_val = matrix[row][col].abs();
			}
		}
		if pivot_val == 0.0 {
			return 0.0;
		}
		if pivot_row != col {
			matrix.swap(pivot_row, col);
			sign = -sign;
		}
		for row in (col + 1)..n {
			let factor = matrix[row][col] / matrix[col][col];
			if factor == 0.0 {
				continue;
			}
			for c in col..n {
				matrix[row][c] -= factor * matrix[col][c];
			}
		}
	}
	let mut det = sign;
	for i in 0..n {
		det *= matrix[i][i];
	}
	det
}

/// Sign of the orientation of the simplex `p[0], p[1], ..., p[d]` in `d`
/// dimensions: positive if `p[1..]` wind positively around `p[0]`.
pub fn orient(points: &[&Point]) -> i32 {
	let d = points.len() - 1;
	let p0 = points[0];
	let mut rows = Vec::with_capacity(d);
	for p in &points[1..] {
		let mut row = Vec::with_capacity(d);
		for i in 0..d {
			row.push(p.coord(i) - p0.coord(i));
		}
		rows.push(row);
	}
	signum(determinant(rows))
}

/// Sign of the in-sphere predicate: positive when `q` lies strictly inside
/// the circumsphere of the positively oriented simplex `p[0..=d]`.
pub fn in_sphere(points: &[&Point], q: &Point) -> i32 {
	let d = points.len() - 1;
	let mut rows = Vec::with_capacity(d + 1);
	for p in points.iter().chain(std::iter::once(&q)) {
		let mut row = Vec::with_capacity(d + 2);
		for i in 0..d {
			row.push(p.coord(i));
		}
		row.push(p.squared_norm());
		row.push(1.0);
		rows.push(row);
	}
	// The classical in-sphere determinant carries an extra sign flip
	// relative to `orient` because of the lifted row ordering, hence the
	// negation: a positively oriented simplex reports `q` inside its
	// circumsphere as a positive in-sphere determinant only after this flip.
	let base_sign = if d % 2 == 0 { 1.0 } else { -1.0 };
	signum(base_sign * determinant(rows))
}

fn signum(x: f64) -> i32 {
	if x > 0.0 {
		1
	} else if x < 0.0 {
		-1
	} else {
		0
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn p(coords: &[f64]) -> Point {
		Point::new(coords.to_vec())
	}

	#[test]
	fn orient_2d_detects_ccw_triangle() {
		let a = p(&[0.0, 0.0]);
		let b = p(&[1.0, 0.0]);
		let c = p(&[0.0, 1.0]);
		assert_eq!(orient(&[&a, &b, &c]), 1);
		assert_eq!(orient(&[&a, &c, &b]), -1);
	}

	#[test]
	fn orient_2d_collinear_is_zero() {
		let a = p(&[0.0, 0.0]);
		let b = p(&[1.0, 0.0]);
		let c = p(&[2.0, 0.0]);
		assert_eq!(orient(&[&a, &b, &c]), 0);
	}

	#[test]
	fn in_sphere_2d_center_point_is_inside() {
		let a = p(&[1.0, 0.0]);
		let b = p(&[-1.0, 0.0]);
		let c = p(&[0.0, 1.0]);
		assert_eq!(orient(&[&a, &b, &c]), 1);
		let center = p(&[0.0, 0.0]);
		assert_eq!(in_sphere(&[&a, &b, &c], &center), 1);
		let far = p(&[10.0, 10.0]);
		assert_eq!(in_sphere(&[&a, &b, &c], &far), -1);
	}

	#[test]
	fn orient_3d_detects_positive_tetrahedron() {
		let a = p(&[0.0, 0.0, 0.0]);
		let b = p(&[1.0, 0.0, 0.0]);
		let c = p(&[0.0, 1.0, 0.0]);
		let d = p(&[0.0, 0.0, 1.0]);
		assert_eq!(orient(&[&a, &b, &c, &d]), 1);
	}
}
