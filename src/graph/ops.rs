// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Names of the calls the factories recognise, and their argument keys.

pub const PACKET_BORROW_NEXT_CHUNK: &str = "packet_borrow_next_chunk";
pub const PACKET_RETURN_CHUNK: &str = "packet_return_chunk";
pub const CURRENT_TIME: &str = "current_time";

pub const MAP_ALLOCATE: &str = "map_allocate";
pub const MAP_GET: &str = "map_get";
pub const MAP_PUT: &str = "map_put";
pub const MAP_ERASE: &str = "map_erase";

pub const VECTOR_ALLOCATE: &str = "vector_allocate";
pub const VECTOR_BORROW: &str = "vector_borrow";
pub const VECTOR_RETURN: &str = "vector_return";

pub const DCHAIN_ALLOCATE: &str = "dchain_allocate";
pub const DCHAIN_ALLOCATE_NEW_INDEX: &str = "dchain_allocate_new_index";
pub const DCHAIN_REJUVENATE_INDEX: &str = "dchain_rejuvenate_index";
pub const DCHAIN_FREE_INDEX: &str = "dchain_free_index";

pub const CMS_ALLOCATE: &str = "cms_allocate";
pub const CMS_INCREMENT: &str = "cms_increment";
pub const CMS_COUNT_MIN: &str = "cms_count_min";

pub const EXPIRE_ITEMS_SINGLE_MAP: &str = "expire_items_single_map";

/// Calls every target can prove to be no-ops.
pub const NO_OPS: &[&str] = &[PACKET_RETURN_CHUNK, CURRENT_TIME];

/// Allocation calls, which the graph indexes by object address.
pub const ALLOCATIONS: &[&str] = &[MAP_ALLOCATE, VECTOR_ALLOCATE, DCHAIN_ALLOCATE, CMS_ALLOCATE];

pub mod arg {
    pub const OBJ: &str = "obj";
    pub const KEY: &str = "key";
    pub const VALUE: &str = "value";
    pub const INDEX: &str = "index";
    pub const LENGTH: &str = "length";
    pub const CAPACITY: &str = "capacity";
    pub const VALUE_WIDTH: &str = "value_width";
    pub const ELEM_WIDTH: &str = "elem_width";
    pub const HEIGHT: &str = "height";
    pub const WIDTH: &str = "width";
    pub const CHAIN: &str = "chain";
}
