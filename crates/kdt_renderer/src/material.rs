//! Surface materials.
//!
//! Materials form a closed set. The classic integrator only needs
//! [`Material::scatter`]; the physical integrator additionally reads the
//! ambient/diffuse/reflective/emissive terms of [`PhysicalMaterial`].

use crate::sampling::random_in_unit_sphere;
use crate::{HitRecord, Ray};
use kdt_math::{reflect, Vec3};
use rand::RngCore;

/// Color type alias (linear RGB, unbounded above)
pub type Color = Vec3;

/// Outcome of a successful scatter.
#[derive(Debug, Clone, Copy)]
pub struct ScatterResult {
    pub attenuation: Color,
    pub scattered: Ray,
}

/// Every material a scene can reference.
#[derive(Debug, Clone)]
pub enum Material {
    Lambertian(Lambertian),
    Metal(Metal),
    Physical(PhysicalMaterial),
}

impl Material {
    /// Scatter an incoming ray.
    ///
    /// Returns `None` when the ray is absorbed.
    pub fn scatter(&self, ray_in: &Ray, rec: &HitRecord, rng: &mut dyn RngCore) -> Option<ScatterResult> {
        match self {
            Material::Lambertian(m) => m.scatter(rec, rng),
            Material::Metal(m) => m.scatter(ray_in, rec),
            Material::Physical(m) => m.scatter(ray_in, rec, rng),
        }
    }

    /// Light emitted by the surface. Only physical materials emit.
    pub fn emission(&self) -> Color {
        match self {
            Material::Physical(m) => m.emissive,
            _ => Color::ZERO,
        }
    }

    pub fn is_emissive(&self) -> bool {
        self.emission() != Color::ZERO
    }

    pub fn as_physical(&self) -> Option<&PhysicalMaterial> {
        match self {
            Material::Physical(m) => Some(m),
            _ => None,
        }
    }

    /// Short name, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Material::Lambertian(_) => "lambertian",
            Material::Metal(_) => "metal",
            Material::Physical(_) => "physical",
        }
    }
}

impl From<Lambertian> for Material {
    fn from(m: Lambertian) -> Self {
        Material::Lambertian(m)
    }
}

impl From<Metal> for Material {
    fn from(m: Metal) -> Self {
        Material::Metal(m)
    }
}

impl From<PhysicalMaterial> for Material {
    fn from(m: PhysicalMaterial) -> Self {
        Material::Physical(m)
    }
}

/// Lambertian (diffuse) material.
#[derive(Debug, Clone)]
pub struct Lambertian {
    pub albedo: Color,
}

impl Lambertian {
    pub fn new(albedo: Color) -> Self {
        Self { albedo }
    }

    fn scatter(&self, rec: &HitRecord, rng: &mut dyn RngCore) -> Option<ScatterResult> {
        let normal = rec.normal.normalize_or_zero();
        let mut direction = normal + random_in_unit_sphere(rng);

        // Catch degenerate scatter direction
        if direction.length_squared() < 1e-12 {
            direction = normal;
        }

        Some(ScatterResult {
            attenuation: self.albedo,
            scattered: Ray::new(rec.p, direction),
        })
    }
}

/// Perfect mirror.
#[derive(Debug, Clone)]
pub struct Metal {
    pub albedo: Color,
}

impl Metal {
    pub fn new(albedo: Color) -> Self {
        Self { albedo }
    }

    fn scatter(&self, ray_in: &Ray, rec: &HitRecord) -> Option<ScatterResult> {
        let normal = rec.normal.normalize_or_zero();
        let reflected = reflect(ray_in.direction().normalize_or_zero(), normal);

        // Only scatter if the reflected ray leaves the surface
        (reflected.dot(normal) > 0.0).then(|| ScatterResult {
            attenuation: self.albedo,
            scattered: Ray::new(rec.p, reflected),
        })
    }
}

/// Material read term by term by the physical integrator.
#[derive(Debug, Clone)]
pub struct PhysicalMaterial {
    pub ambient: Color,
    pub diffuse: Color,
    pub reflective: Color,
    pub emissive: Color,
    /// 0 = mirror, larger values blur the reflection
    pub roughness: f64,
}

impl PhysicalMaterial {
    /// Ambient defaults to a tenth of the diffuse albedo; no emission.
    pub fn new(diffuse: Color, reflective: Color, roughness: f64) -> Self {
        Self {
            ambient: diffuse * 0.1,
            diffuse,
            reflective,
            emissive: Color::ZERO,
            roughness: roughness.max(0.0),
        }
    }

    pub fn with_emission(mut self, emissive: Color) -> Self {
        self.emissive = emissive;
        self
    }

    pub fn with_ambient(mut self, ambient: Color) -> Self {
        self.ambient = ambient;
        self
    }

    pub fn is_emissive(&self) -> bool {
        self.emissive != Color::ZERO
    }

    /// Reflect about the normal jittered by `roughness`.
    fn scatter(&self, ray_in: &Ray, rec: &HitRecord, rng: &mut dyn RngCore) -> Option<ScatterResult> {
        let normal = rec.normal.normalize_or_zero();
        let mut facet = normal;
        if self.roughness > 0.0 {
            facet = (normal + random_in_unit_sphere(rng) * self.roughness).normalize_or_zero();
            if facet == Vec3::ZERO {
                facet = normal;
            }
        }
        let direction = reflect(ray_in.direction().normalize_or_zero(), facet);

        (direction.dot(normal) > 0.0).then(|| ScatterResult {
            attenuation: self.reflective,
            scattered: Ray::new(rec.p, direction),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn record_facing_up(material: &Material) -> HitRecord<'_> {
        HitRecord {
            p: Vec3::ZERO,
            normal: Vec3::Y,
            material,
            ..HitRecord::default()
        }
    }

    #[test]
    fn test_metal_mirror_reflection() {
        let material = Material::from(Metal::new(Color::splat(0.8)));
        let rec = record_facing_up(&material);
        let ray = Ray::new(Vec3::new(-1.0, 1.0, 0.0), Vec3::new(1.0, -1.0, 0.0));
        let mut rng = StdRng::seed_from_u64(0);

        let result = material.scatter(&ray, &rec, &mut rng).expect("mirror should reflect");
        let expected = Vec3::new(1.0, 1.0, 0.0).normalize();
        assert!((result.scattered.direction() - expected).length() < 1e-12);
        assert_eq!(result.attenuation, Color::splat(0.8));
    }

    #[test]
    fn test_lambertian_scatters_into_hemisphere() {
        let material = Material::from(Lambertian::new(Color::splat(0.5)));
        let rec = record_facing_up(&material);
        let ray = Ray::new(Vec3::Y, Vec3::NEG_Y);
        let mut rng = StdRng::seed_from_u64(1);

        for _ in 0..100 {
            let result = material.scatter(&ray, &rec, &mut rng).expect("lambertian always scatters");
            // normal + point in unit sphere never points below the surface
            assert!(result.scattered.direction().y >= 0.0);
        }
    }

    #[test]
    fn test_smooth_physical_matches_mirror() {
        let material = Material::from(PhysicalMaterial::new(Color::splat(0.5), Color::splat(0.9), 0.0));
        let rec = record_facing_up(&material);
        let ray = Ray::new(Vec3::new(0.0, 1.0, -1.0), Vec3::new(0.0, -1.0, 1.0));
        let mut rng = StdRng::seed_from_u64(2);

        let result = material.scatter(&ray, &rec, &mut rng).expect("should reflect");
        let expected = Vec3::new(0.0, 1.0, 1.0).normalize();
        assert!((result.scattered.direction() - expected).length() < 1e-12);
        assert_eq!(result.attenuation, Color::splat(0.9));
    }

    #[test]
    fn test_physical_defaults_and_emission() {
        let plain = PhysicalMaterial::new(Color::new(0.5, 0.2, 0.1), Color::ZERO, 0.3);
        assert!(plain.ambient.abs_diff_eq(Color::new(0.05, 0.02, 0.01), 1e-12));
        assert!(!plain.is_emissive());

        let lamp = Material::from(plain.with_emission(Color::splat(4.0)));
        assert!(lamp.is_emissive());
        assert_eq!(lamp.emission(), Color::splat(4.0));

        assert!(!Material::from(Metal::new(Color::ONE)).is_emissive());
    }
}
