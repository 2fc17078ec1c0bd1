//! Management screens
//!
//! Each screen is the same list pattern with different fields: which
//! endpoints it calls, how it pages and filters, what its rows show, and
//! which actions its rows offer.

use crate::actions::ActionKind;
use crate::client::{BodyShape, Endpoint, Method, UploadRules};
use crate::filter::FilterField;
use crate::form::FormField;
use crate::render::{Column, ColumnKind, StatusLabel, Tone};

/// Default cover art for songs without one
pub const DEFAULT_SONG_COVER: &str = "/img/songPic/default.jpg";
/// Default avatar for singers and users without one
pub const DEFAULT_AVATAR: &str = "/img/avatar/default.jpg";

const INTRO_CHARS: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Portal {
    Admin,
    User,
}

impl Portal {
    pub fn name(&self) -> &'static str {
        match self {
            Portal::Admin => "admin",
            Portal::User => "user",
        }
    }
}

/// Where slicing into pages happens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Paging {
    /// Everything is fetched once and paged locally
    Client,
    /// The backend returns one page plus page metadata
    Server,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Endpoints {
    pub list: Option<Endpoint>,
    pub get: Option<Endpoint>,
    pub create: Option<Endpoint>,
    pub update: Option<Endpoint>,
    pub delete: Option<Endpoint>,
    pub delete_batch: Option<Endpoint>,
    pub approve: Option<Endpoint>,
    pub reject: Option<Endpoint>,
    pub upload: Option<(Endpoint, UploadRules)>,
}

impl Endpoints {
    const NONE: Endpoints = Endpoints {
        list: None,
        get: None,
        create: None,
        update: None,
        delete: None,
        delete_batch: None,
        approve: None,
        reject: None,
        upload: None,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenSpec {
    pub name: &'static str,
    pub title: &'static str,
    pub portal: Portal,
    pub page_size: u64,
    pub paging: Paging,
    /// Criteria are sent to the backend instead of applied locally
    pub server_filter: bool,
    /// Parent id this screen is scoped to (tag or category), if any
    pub scope_param: Option<&'static str>,
    pub columns: &'static [Column],
    pub filters: &'static [FilterField],
    pub form: &'static [FormField],
    pub row_actions: &'static [ActionKind],
    /// Re-fetch the record before editing instead of trusting the row
    pub fresh_edit: bool,
    /// Field holding the audio path for the play action
    pub media_field: Option<&'static str>,
    pub endpoints: Endpoints,
}

impl ScreenSpec {
    pub fn supports_batch_delete(&self) -> bool {
        self.endpoints.delete_batch.is_some()
    }

    pub fn offers(&self, kind: ActionKind) -> bool {
        self.row_actions.contains(&kind)
    }
}

const SONG_STATUS: &[StatusLabel] = &[
    StatusLabel::new(0, "Pending", Tone::Warn),
    StatusLabel::new(1, "Approved", Tone::Good),
    StatusLabel::new(2, "Rejected", Tone::Bad),
];

const USER_STATUS: &[StatusLabel] = &[
    StatusLabel::new(0, "Disabled", Tone::Bad),
    StatusLabel::new(1, "Active", Tone::Good),
];

const USER_ROLE: &[StatusLabel] = &[
    StatusLabel::new(0, "User", Tone::Neutral),
    StatusLabel::new(1, "Admin", Tone::Warn),
];

const SINGER_SEX: &[StatusLabel] = &[
    StatusLabel::new(0, "Female", Tone::Neutral),
    StatusLabel::new(1, "Male", Tone::Neutral),
    StatusLabel::new(2, "Group", Tone::Neutral),
];

const AUDIO_UPLOAD: UploadRules = UploadRules {
    field: "file",
    extensions: &["mp3", "flac", "wav", "ogg", "m4a"],
    max_bytes: 50 * 1024 * 1024,
};

const SONG_COLUMNS: &[Column] = &[
    Column::new("ID", "id", ColumnKind::Text),
    Column::new("Cover", "pic", ColumnKind::Media { default_asset: DEFAULT_SONG_COVER }),
    Column::new("Name", "name", ColumnKind::Truncated { max_chars: 40 }),
    Column::new("Singer", "singerName", ColumnKind::Text),
    Column::new("Categories", "categoryIds", ColumnKind::IdList),
    Column::new("Status", "status", ColumnKind::Status(SONG_STATUS)),
    Column::new("Uploaded", "createTime", ColumnKind::Timestamp),
];

const SCOPED_SONG_COLUMNS: &[Column] = &[
    Column::new("ID", "id", ColumnKind::Text),
    Column::new("Name", "name", ColumnKind::Truncated { max_chars: 40 }),
    Column::new("Singer", "singerName", ColumnKind::Text),
    Column::new("Intro", "introduction", ColumnKind::Truncated { max_chars: INTRO_CHARS }),
];

const SONG_FILTERS: &[FilterField] = &[
    FilterField::contains("name", &["name", "singerName"]),
    FilterField::equals("singerId", &["singerId"]),
    FilterField::member("categoryId", &["categoryIds"]),
    FilterField::equals("status", &["status"]),
];

const SONG_FORM: &[FormField] = &[
    FormField::text("name", "Name").required().max(100),
    FormField::text("singerId", "Singer").required().numeric(),
    FormField::text("introduction", "Introduction").max(500),
    FormField::text("lyric", "Lyric").max(5000),
];

pub const CATEGORIES: ScreenSpec = ScreenSpec {
    name: "categories",
    title: "Categories",
    portal: Portal::Admin,
    page_size: 10,
    paging: Paging::Client,
    server_filter: false,
    scope_param: None,
    columns: &[
        Column::new("ID", "id", ColumnKind::Text),
        Column::new("Name", "name", ColumnKind::Text),
        Column::new("Description", "description", ColumnKind::Truncated { max_chars: INTRO_CHARS }),
        Column::new("Created", "createTime", ColumnKind::Timestamp),
    ],
    filters: &[FilterField::contains("name", &["name"])],
    form: &[
        FormField::text("name", "Name").required().max(50),
        FormField::text("description", "Description").max(200),
    ],
    row_actions: &[ActionKind::Edit, ActionKind::Delete],
    fresh_edit: false,
    media_field: None,
    endpoints: Endpoints {
        list: Some(Endpoint::new(Method::Get, "/category/list", BodyShape::Query)),
        get: Some(Endpoint::new(Method::Get, "/category/{id}", BodyShape::Query)),
        create: Some(Endpoint::new(Method::Post, "/category/add", BodyShape::Json)),
        update: Some(Endpoint::new(Method::Put, "/category/update", BodyShape::Json)),
        delete: Some(Endpoint::new(Method::Delete, "/category/{id}", BodyShape::Query)),
        delete_batch: Some(Endpoint::new(Method::Delete, "/category/batch", BodyShape::Json)),
        ..Endpoints::NONE
    },
};

pub const SINGERS: ScreenSpec = ScreenSpec {
    name: "singers",
    title: "Singers",
    portal: Portal::Admin,
    page_size: 10,
    paging: Paging::Server,
    server_filter: true,
    scope_param: None,
    columns: &[
        Column::new("ID", "id", ColumnKind::Text),
        Column::new("Photo", "pic", ColumnKind::Media { default_asset: DEFAULT_AVATAR }),
        Column::new("Name", "name", ColumnKind::Text),
        Column::new("Sex", "sex", ColumnKind::Status(SINGER_SEX)),
        Column::new("Location", "location", ColumnKind::Text),
        Column::new("Introduction", "introduction", ColumnKind::Truncated { max_chars: INTRO_CHARS }),
    ],
    filters: &[
        FilterField::contains("name", &["name"]),
        FilterField::equals("sex", &["sex"]),
    ],
    form: &[
        FormField::text("name", "Name").required().max(50),
        FormField::text("sex", "Sex").numeric(),
        FormField::text("location", "Location").max(50),
        FormField::text("introduction", "Introduction").max(500),
    ],
    row_actions: &[ActionKind::Edit, ActionKind::Delete],
    fresh_edit: false,
    media_field: None,
    endpoints: Endpoints {
        list: Some(Endpoint::new(Method::Get, "/singer/page", BodyShape::Query)),
        get: Some(Endpoint::new(Method::Get, "/singer/detail", BodyShape::Query)),
        create: Some(Endpoint::new(Method::Post, "/singer/add", BodyShape::Form)),
        update: Some(Endpoint::new(Method::Post, "/singer/update", BodyShape::Form)),
        delete: Some(Endpoint::new(Method::Get, "/singer/delete", BodyShape::Query)),
        delete_batch: Some(Endpoint::new(Method::Post, "/singer/deleteBatch", BodyShape::Form)),
        ..Endpoints::NONE
    },
};

pub const SONGS: ScreenSpec = ScreenSpec {
    name: "songs",
    title: "Songs",
    portal: Portal::Admin,
    page_size: 10,
    paging: Paging::Server,
    server_filter: true,
    scope_param: None,
    columns: SONG_COLUMNS,
    filters: SONG_FILTERS,
    form: SONG_FORM,
    row_actions: &[
        ActionKind::Play,
        ActionKind::Edit,
        ActionKind::Approve,
        ActionKind::Reject,
        ActionKind::Delete,
    ],
    fresh_edit: true,
    media_field: Some("url"),
    endpoints: Endpoints {
        list: Some(Endpoint::new(Method::Get, "/song/page", BodyShape::Query)),
        get: Some(Endpoint::new(Method::Get, "/song/{id}", BodyShape::Query)),
        update: Some(Endpoint::new(Method::Put, "/song/update", BodyShape::Json)),
        delete: Some(Endpoint::new(Method::Delete, "/song/{id}", BodyShape::Query)),
        delete_batch: Some(Endpoint::new(Method::Delete, "/song/batch", BodyShape::Json)),
        approve: Some(Endpoint::new(Method::Post, "/song/{id}/approve", BodyShape::Form)),
        reject: Some(Endpoint::new(Method::Post, "/song/{id}/reject", BodyShape::Form)),
        upload: Some((
            Endpoint::new(Method::Post, "/song/upload", BodyShape::Form),
            AUDIO_UPLOAD,
        )),
        ..Endpoints::NONE
    },
};

pub const USERS: ScreenSpec = ScreenSpec {
    name: "users",
    title: "Users",
    portal: Portal::Admin,
    page_size: 10,
    paging: Paging::Client,
    server_filter: false,
    scope_param: None,
    columns: &[
        Column::new("ID", "id", ColumnKind::Text),
        Column::new("Avatar", "avatar", ColumnKind::Media { default_asset: DEFAULT_AVATAR }),
        Column::new("Username", "username", ColumnKind::Text),
        Column::new("Email", "email", ColumnKind::Text),
        Column::new("Role", "role", ColumnKind::Status(USER_ROLE)),
        Column::new("Status", "status", ColumnKind::Status(USER_STATUS)),
        Column::new("Joined", "createTime", ColumnKind::Timestamp),
    ],
    filters: &[
        FilterField::contains("username", &["username", "email"]),
        FilterField::equals("status", &["status"]),
        FilterField::equals("role", &["role"]),
    ],
    form: &[
        FormField::text("username", "Username").required().max(30),
        FormField::text("email", "Email").max(100),
        FormField::text("status", "Status").numeric(),
    ],
    row_actions: &[ActionKind::Edit, ActionKind::Delete],
    fresh_edit: true,
    media_field: None,
    endpoints: Endpoints {
        list: Some(Endpoint::new(Method::Get, "/user/list", BodyShape::Query)),
        get: Some(Endpoint::new(Method::Get, "/user/{id}", BodyShape::Query)),
        update: Some(Endpoint::new(Method::Put, "/user/update", BodyShape::Json)),
        delete: Some(Endpoint::new(Method::Delete, "/user/{id}", BodyShape::Query)),
        delete_batch: Some(Endpoint::new(Method::Post, "/user/deleteBatch", BodyShape::Json)),
        ..Endpoints::NONE
    },
};

pub const TAG_SONGS: ScreenSpec = ScreenSpec {
    name: "tag-songs",
    title: "Songs in tag",
    portal: Portal::Admin,
    page_size: 10,
    paging: Paging::Client,
    server_filter: false,
    scope_param: Some("tagId"),
    columns: SCOPED_SONG_COLUMNS,
    filters: &[
        FilterField::contains("name", &["name", "singerName"]),
        FilterField::equals("singerId", &["singerId"]),
    ],
    form: &[],
    row_actions: &[ActionKind::Play, ActionKind::Delete],
    fresh_edit: false,
    media_field: Some("url"),
    endpoints: Endpoints {
        list: Some(Endpoint::new(Method::Get, "/tag/{scope}/songs", BodyShape::Query)),
        delete: Some(Endpoint::new(Method::Delete, "/tag/{scope}/songs/{id}", BodyShape::Query)),
        delete_batch: Some(Endpoint::new(Method::Post, "/tag/{scope}/songs/remove", BodyShape::Json)),
        ..Endpoints::NONE
    },
};

pub const CATEGORY_SONGS: ScreenSpec = ScreenSpec {
    name: "category-songs",
    title: "Songs in category",
    portal: Portal::Admin,
    page_size: 10,
    paging: Paging::Client,
    server_filter: false,
    scope_param: Some("categoryId"),
    columns: SCOPED_SONG_COLUMNS,
    filters: &[
        FilterField::contains("name", &["name", "singerName"]),
        FilterField::member("tagId", &["tagIds"]),
    ],
    form: &[],
    row_actions: &[ActionKind::Play, ActionKind::Delete],
    fresh_edit: false,
    media_field: Some("url"),
    endpoints: Endpoints {
        list: Some(Endpoint::new(Method::Get, "/category/songs", BodyShape::Query)),
        delete: Some(Endpoint::new(Method::Post, "/category/{scope}/removeSong", BodyShape::Form)),
        ..Endpoints::NONE
    },
};

/// Approved songs as the User portal sees them
pub const CATALOG: ScreenSpec = ScreenSpec {
    name: "catalog",
    title: "Browse songs",
    portal: Portal::User,
    page_size: 12,
    paging: Paging::Server,
    server_filter: true,
    scope_param: None,
    columns: &[
        Column::new("Cover", "pic", ColumnKind::Media { default_asset: DEFAULT_SONG_COVER }),
        Column::new("Name", "name", ColumnKind::Truncated { max_chars: 40 }),
        Column::new("Singer", "singerName", ColumnKind::Text),
        Column::new("Intro", "introduction", ColumnKind::Truncated { max_chars: INTRO_CHARS }),
    ],
    filters: &[
        FilterField::contains("keyword", &["name", "singerName"]),
        FilterField::member("categoryId", &["categoryIds"]),
    ],
    form: &[],
    row_actions: &[ActionKind::Play],
    fresh_edit: false,
    media_field: Some("url"),
    endpoints: Endpoints {
        list: Some(Endpoint::new(Method::Get, "/song/approved", BodyShape::Query)),
        get: Some(Endpoint::new(Method::Get, "/song/{id}", BodyShape::Query)),
        upload: Some((
            Endpoint::new(Method::Post, "/song/upload", BodyShape::Form),
            AUDIO_UPLOAD,
        )),
        ..Endpoints::NONE
    },
};

pub const ALL: &[&ScreenSpec] = &[
    &CATEGORIES,
    &SINGERS,
    &SONGS,
    &USERS,
    &TAG_SONGS,
    &CATEGORY_SONGS,
    &CATALOG,
];

/// Look up a screen by name within a portal
pub fn find(name: &str, portal: Portal) -> Option<&'static ScreenSpec> {
    ALL.iter()
        .copied()
        .find(|s| s.name == name && s.portal == portal)
}

pub fn names(portal: Portal) -> Vec<&'static str> {
    ALL.iter()
        .filter(|s| s.portal == portal)
        .map(|s| s.name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_respects_portal() {
        assert!(find("songs", Portal::Admin).is_some());
        assert!(find("songs", Portal::User).is_none());
        assert!(find("catalog", Portal::User).is_some());
        assert!(find("nope", Portal::Admin).is_none());
    }

    #[test]
    fn test_every_screen_can_list() {
        for screen in ALL {
            assert!(screen.endpoints.list.is_some(), "{} has no list endpoint", screen.name);
            assert!(screen.page_size > 0);
        }
    }

    #[test]
    fn test_row_actions_have_endpoints() {
        for screen in ALL {
            if screen.offers(ActionKind::Delete) {
                assert!(screen.endpoints.delete.is_some(), "{}", screen.name);
            }
            if screen.offers(ActionKind::Approve) {
                assert!(screen.endpoints.approve.is_some(), "{}", screen.name);
            }
            if screen.offers(ActionKind::Edit) {
                assert!(!screen.form.is_empty(), "{}", screen.name);
            }
            if screen.offers(ActionKind::Play) {
                assert!(screen.media_field.is_some(), "{}", screen.name);
            }
        }
    }

    #[test]
    fn test_server_paged_screens_filter_server_side() {
        for screen in ALL.iter().filter(|s| s.paging == Paging::Server) {
            assert!(screen.server_filter, "{}", screen.name);
        }
    }

    #[test]
    fn test_admin_names() {
        let names = names(Portal::Admin);
        assert_eq!(names.len(), 6);
        assert!(names.contains(&"tag-songs"));
    }
}
