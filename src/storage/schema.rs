//! Database schema definitions
//!
//! The schema grew in three steps and ships as three built-in migrations.
//! Statements inside one migration are separated by
//! [`STATEMENT_BREAKPOINT`](crate::migrations::STATEMENT_BREAKPOINT).

/// Base content table
pub const CREATE_CONTENT_TABLE: &str = r#"
CREATE TABLE `content` (
    `id` integer PRIMARY KEY AUTOINCREMENT NOT NULL,
    `slug` text NOT NULL,
    `type` text NOT NULL,
    `title` text NOT NULL,
    `date` text,
    `status` text DEFAULT 'draft'
);
--> statement-breakpoint
CREATE UNIQUE INDEX `content_slug_unique` ON `content` (`slug`);
"#;

/// Detail columns, added one by one.
///
/// Older databases received several of these by hand, which is what the
/// reconciler exists for.
pub const ADD_CONTENT_DETAILS: &str = r#"
ALTER TABLE `content` ADD `subheading` text;
--> statement-breakpoint
ALTER TABLE `content` ADD `excerpt` text;
--> statement-breakpoint
ALTER TABLE `content` ADD `author` text;
--> statement-breakpoint
ALTER TABLE `content` ADD `pinned` integer DEFAULT 0;
--> statement-breakpoint
ALTER TABLE `content` ADD `repo_url` text;
--> statement-breakpoint
ALTER TABLE `content` ADD `demo_url` text;
--> statement-breakpoint
ALTER TABLE `content` ADD `markdown_content` text DEFAULT '' NOT NULL;
--> statement-breakpoint
ALTER TABLE `content` ADD `compiled_content` text;
--> statement-breakpoint
ALTER TABLE `content` ADD `full_path` text;
--> statement-breakpoint
ALTER TABLE `content` ADD `created_at` text;
--> statement-breakpoint
ALTER TABLE `content` ADD `updated_at` text;
"#;

/// Tags, the content/tag association and lookup indexes
pub const CREATE_TAG_TABLES: &str = r#"
CREATE TABLE `tags` (
    `id` integer PRIMARY KEY AUTOINCREMENT NOT NULL,
    `name` text NOT NULL,
    `slug` text NOT NULL,
    `created_at` text
);
--> statement-breakpoint
CREATE UNIQUE INDEX `tags_name_unique` ON `tags` (`name`);
--> statement-breakpoint
CREATE UNIQUE INDEX `tags_slug_unique` ON `tags` (`slug`);
--> statement-breakpoint
CREATE INDEX `idx_tags_slug` ON `tags` (`slug`);
--> statement-breakpoint
CREATE TABLE `content_tags` (
    `content_id` integer NOT NULL,
    `tag_id` integer NOT NULL,
    PRIMARY KEY(`content_id`, `tag_id`),
    FOREIGN KEY (`content_id`) REFERENCES `content`(`id`) ON UPDATE no action ON DELETE cascade,
    FOREIGN KEY (`tag_id`) REFERENCES `tags`(`id`) ON UPDATE no action ON DELETE cascade
);
--> statement-breakpoint
CREATE INDEX `idx_content_type` ON `content` (`type`);
--> statement-breakpoint
CREATE INDEX `idx_content_status` ON `content` (`status`);
--> statement-breakpoint
CREATE INDEX `idx_content_date` ON `content` (`date`);
--> statement-breakpoint
CREATE INDEX `idx_content_slug` ON `content` (`slug`);
"#;

/// Built-in migrations as `(tag, folder_millis, sql)`, in journal order
pub const BUILTIN_MIGRATIONS: &[(&str, i64, &str)] = &[
    ("0000_create_content", 1_735_689_600_000, CREATE_CONTENT_TABLE),
    ("0001_content_details", 1_738_368_000_000, ADD_CONTENT_DETAILS),
    ("0002_create_tags", 1_740_787_200_000, CREATE_TAG_TABLES),
];
