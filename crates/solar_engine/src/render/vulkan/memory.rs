//! Device memory type selection

use ash::vk;

/// First memory type allowed by `type_bits` whose flags contain `required`.
///
/// Types are scanned in index order and the first fit wins, so the same
/// device always yields the same choice. `None` means nothing matched.
pub fn find_memory_type_index(
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
    type_bits: u32,
    required: vk::MemoryPropertyFlags,
) -> Option<u32> {
    let count = memory_properties.memory_type_count.min(vk::MAX_MEMORY_TYPES as u32);
    (0..count).find(|&index| {
        let allowed = type_bits & (1 << index) != 0;
        let flags = memory_properties.memory_types[index as usize].property_flags;
        allowed && flags.contains(required)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn properties(types: &[vk::MemoryPropertyFlags]) -> vk::PhysicalDeviceMemoryProperties {
        let mut props = vk::PhysicalDeviceMemoryProperties {
            memory_type_count: types.len() as u32,
            ..Default::default()
        };
        for (slot, &flags) in props.memory_types.iter_mut().zip(types) {
            slot.property_flags = flags;
        }
        props
    }

    #[test]
    fn test_first_fit_within_allowed_types() {
        let props = properties(&[
            vk::MemoryPropertyFlags::HOST_VISIBLE,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            vk::MemoryPropertyFlags::HOST_VISIBLE,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        ]);

        // Requirements allow indices 1 and 3; only 3 is host visible
        let bits = (1 << 1) | (1 << 3);
        assert_eq!(
            find_memory_type_index(&props, bits, vk::MemoryPropertyFlags::HOST_VISIBLE),
            Some(3)
        );
    }

    #[test]
    fn test_no_match_returns_none() {
        let props = properties(&[
            vk::MemoryPropertyFlags::HOST_VISIBLE,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        ]);
        assert_eq!(
            find_memory_type_index(&props, 0b10, vk::MemoryPropertyFlags::HOST_VISIBLE),
            None
        );
        assert_eq!(
            find_memory_type_index(&props, 0, vk::MemoryPropertyFlags::empty()),
            None
        );
    }

    #[test]
    fn test_prefers_lowest_index() {
        let props = properties(&[
            vk::MemoryPropertyFlags::DEVICE_LOCAL | vk::MemoryPropertyFlags::HOST_VISIBLE,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        ]);
        assert_eq!(
            find_memory_type_index(&props, 0b11, vk::MemoryPropertyFlags::DEVICE_LOCAL),
            Some(0)
        );
    }

    #[test]
    fn test_ignores_types_past_count() {
        let mut props = properties(&[vk::MemoryPropertyFlags::DEVICE_LOCAL]);
        props.memory_types[1].property_flags = vk::MemoryPropertyFlags::HOST_VISIBLE;
        assert_eq!(
            find_memory_type_index(&props, 0b11, vk::MemoryPropertyFlags::HOST_VISIBLE),
            None
        );
    }
}
