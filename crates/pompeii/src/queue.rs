// Copyright 2026 The MYR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Queue
//!
//! Queue families of one physical device and the choice of which ones draw and present.  A device
//! is allowed to expose no graphics family at all, and a graphics family is not required to present
//! to any given surface, so the choice can come up empty.  What happens then is up to the
//! `PresentPolicy`.

use ash::vk;
use log::{debug, info, warn};

use crate::prelude::*;

/// One queue family of one physical device.
#[derive(Clone, Debug)]
pub struct QueueFamily {
    pub index: u32,
    pub queue_count: u32,
    pub graphics: bool,
    pub compute: bool,
    pub transfer: bool,

    // Only used to ask about presentation.
    instance: vk::Instance,
    physical_device: vk::PhysicalDevice,
}

impl QueueFamily {
    pub fn new(
        index: u32,
        props: &vk::QueueFamilyProperties,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
    ) -> Self {
        QueueFamily {
            index,
            queue_count: props.queue_count,
            graphics: props.queue_flags.contains(vk::QueueFlags::GRAPHICS),
            compute: props.queue_flags.contains(vk::QueueFlags::COMPUTE),
            transfer: props.queue_flags.contains(vk::QueueFlags::TRANSFER),
            instance,
            physical_device,
        }
    }

    /// Whether queues of this family can present to `surface`.  A failed query counts as no.
    pub fn present_support<B: Backend>(&self, backend: &B, surface: &Surface) -> bool {
        match backend.surface_support(
            self.instance,
            self.physical_device,
            self.index,
            surface.handle(),
        ) {
            Ok(supported) => supported,
            Err(e) => {
                warn!("present support query for family {} failed: {e}", self.index);
                false
            }
        }
    }
}

/// What to do when no family qualifies for a role.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PresentPolicy {
    /// Leave the index at 0, even if family 0 cannot do the job.
    #[default]
    Lenient,
    /// Fail with `NoGraphicsFamily` or `NoPresentFamily`.
    Strict,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueSelection {
    pub graphics: u32,
    pub present: u32,
}

/// Choose graphics and present families.
///
/// The last graphics capable family with queues wins the graphics role.  Of those, the last one
/// `present_support` accepts wins the present role.  `present_support` is only asked about
/// graphics capable families.
pub fn select_families<F>(
    families: &[QueueFamily],
    policy: PresentPolicy,
    mut present_support: F,
) -> Result<QueueSelection, VulkanError>
where
    F: FnMut(&QueueFamily) -> bool,
{
    let mut graphics = None;
    let mut present = None;

    for family in families {
        if family.graphics {
            debug!("family: {} graphics", family.index);
        }
        if family.compute {
            debug!("family: {} compute", family.index);
        }
        if family.transfer {
            debug!("family: {} transfer", family.index);
        }

        if family.graphics && family.queue_count > 0 {
            graphics = Some(family.index);
            if present_support(family) {
                present = Some(family.index);
            }
        }
    }

    let selection = match policy {
        PresentPolicy::Lenient => QueueSelection {
            graphics: graphics.unwrap_or(0),
            present: present.unwrap_or(0),
        },
        PresentPolicy::Strict => QueueSelection {
            graphics: graphics.ok_or(VulkanError::NoGraphicsFamily)?,
            present: present.ok_or(VulkanError::NoPresentFamily)?,
        },
    };
    if present.is_none() {
        warn!("no graphics family presents to the surface, using family {}", selection.present);
    }
    info!("Graphics family index: {}", selection.graphics);
    info!("Present family index: {}", selection.present);

    Ok(selection)
}

/// `select_families`, asking the backend about presentation to `surface`.
pub fn select_for_surface<B: Backend>(
    backend: &B,
    families: &[QueueFamily],
    surface: &Surface,
    policy: PresentPolicy,
) -> Result<QueueSelection, VulkanError> {
    select_families(families, policy, |family| {
        family.present_support(backend, surface)
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fake::{window_handles, Call, FakeBackend, FakeFamily, FakeGpu};

    fn family(index: u32, flags: vk::QueueFlags) -> QueueFamily {
        let props = vk::QueueFamilyProperties {
            queue_flags: flags,
            queue_count: 1,
            ..Default::default()
        };
        QueueFamily::new(index, &props, vk::Instance::null(), vk::PhysicalDevice::null())
    }

    // (graphics, present) pairs.
    fn synthetic(layout: &[(bool, bool)]) -> (Vec<QueueFamily>, Vec<bool>) {
        let families = layout
            .iter()
            .enumerate()
            .map(|(i, (graphics, _))| {
                let flags = if *graphics {
                    vk::QueueFlags::GRAPHICS
                } else {
                    vk::QueueFlags::TRANSFER
                };
                family(i as u32, flags)
            })
            .collect();
        (families, layout.iter().map(|(_, p)| *p).collect())
    }

    #[test]
    fn test_last_graphics_and_present_win() {
        let (families, present) = synthetic(&[(false, false), (true, false), (true, true)]);
        let selection = select_families(&families, PresentPolicy::Lenient, |f| {
            present[f.index as usize]
        })
        .unwrap();
        assert_eq!(selection, QueueSelection { graphics: 2, present: 2 });
    }

    #[test]
    fn test_present_only_from_graphics_families() {
        // Family 2 presents but cannot draw.
        let (families, present) = synthetic(&[(true, true), (true, false), (false, true)]);
        let mut asked = Vec::new();
        let selection = select_families(&families, PresentPolicy::Strict, |f| {
            asked.push(f.index);
            present[f.index as usize]
        })
        .unwrap();
        assert_eq!(selection, QueueSelection { graphics: 1, present: 0 });
        assert_eq!(asked, vec![0, 1]);
    }

    #[test]
    fn test_lenient_falls_back_to_zero() {
        let (families, present) = synthetic(&[(false, true), (true, false)]);
        let selection = select_families(&families, PresentPolicy::Lenient, |f| {
            present[f.index as usize]
        })
        .unwrap();
        assert_eq!(selection, QueueSelection { graphics: 1, present: 0 });
    }

    #[test]
    fn test_strict_reports_missing_roles() {
        let (families, present) = synthetic(&[(false, true), (true, false)]);
        let result = select_families(&families, PresentPolicy::Strict, |f| {
            present[f.index as usize]
        });
        assert!(matches!(result, Err(VulkanError::NoPresentFamily)));

        let (families, _) = synthetic(&[(false, true)]);
        let result = select_families(&families, PresentPolicy::Strict, |_| true);
        assert!(matches!(result, Err(VulkanError::NoGraphicsFamily)));
    }

    #[test]
    fn test_empty_graphics_family_skipped() {
        let mut families = vec![
            family(0, vk::QueueFlags::GRAPHICS),
            family(1, vk::QueueFlags::GRAPHICS),
        ];
        families[1].queue_count = 0;
        let selection = select_families(&families, PresentPolicy::Strict, |_| true).unwrap();
        assert_eq!(selection, QueueSelection { graphics: 0, present: 0 });
    }

    #[test]
    fn test_flags_decoded() {
        let f = family(3, vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER);
        assert_eq!(f.index, 3);
        assert!(!f.graphics);
        assert!(f.compute);
        assert!(f.transfer);
    }

    #[test]
    fn test_queue_families_from_backend() {
        let backend = FakeBackend::new().without_gpus().with_gpu(
            FakeGpu::new("families", [4096, 4096]).families(vec![
                FakeFamily::new(vk::QueueFlags::TRANSFER, false),
                FakeFamily::new(vk::QueueFlags::GRAPHICS, false),
                FakeFamily::new(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE, true),
            ]),
        );
        let mut instance = Instance::new(&backend, "queue", "test", &[], &[]).unwrap();
        let gpus = instance.enumerate_gpus(&backend).unwrap();
        let families = gpus[0].queue_families(&backend).unwrap();
        assert_eq!(families.len(), 3);
        assert_eq!(
            families.iter().map(|f| f.index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );

        let (display, window) = window_handles();
        let mut surface = Surface::new(&backend, &instance, display, window).unwrap();
        let selection =
            select_for_surface(&backend, &families, &surface, PresentPolicy::Strict).unwrap();
        assert_eq!(selection, QueueSelection { graphics: 2, present: 2 });

        // A failing query is treated as no support.
        backend.fail(Call::SurfaceSupport, vk::Result::ERROR_SURFACE_LOST_KHR);
        assert!(!families[2].present_support(&backend, &surface));

        surface.destroy(&backend);
        instance.destroy(&backend);
        assert!(backend.violations().is_empty());
    }

    #[test]
    fn test_no_queue_families() {
        let backend = FakeBackend::new()
            .without_gpus()
            .with_gpu(FakeGpu::new("barren", [4096, 4096]).families(Vec::new()));
        let mut instance = Instance::new(&backend, "queue", "test", &[], &[]).unwrap();
        let gpus = instance.enumerate_gpus(&backend).unwrap();
        assert!(matches!(
            gpus[0].queue_families(&backend),
            Err(VulkanError::NoQueueFamilies)
        ));
        instance.destroy(&backend);
    }
}
