//! The demo site's file set.
//!
//! A minimal Next.js app: one page with the practice's details and a button
//! that starts a browser voice call with the provisioned assistant.

use serde::Serialize;
use serde_json::json;
use tracing::debug;

use demoforge_shared::{DemoForgeError, PracticeProfile, Result};

use crate::prompt::{opening_line, system_prompt};

/// One file of the generated demo, path relative to the repository root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedFile {
    pub path: String,
    pub contents: String,
}

impl GeneratedFile {
    fn new(path: &str, contents: String) -> Self {
        Self {
            path: path.to_string(),
            contents,
        }
    }
}

/// Every path [`render_template`] produces, in output order.
pub const TEMPLATE_PATHS: &[&str] = &[
    "package.json",
    "src/app/page.tsx",
    "src/components/VoiceDemo.tsx",
    "src/config/practice.ts",
    "next.config.js",
    "tailwind.config.js",
    "tsconfig.json",
];

/// Render the demo repository contents for `profile`.
pub fn render_template(profile: &PracticeProfile, agent_id: &str) -> Result<Vec<GeneratedFile>> {
    let files = vec![
        GeneratedFile::new("package.json", package_json(profile)?),
        GeneratedFile::new("src/app/page.tsx", PAGE_TSX.to_string()),
        GeneratedFile::new("src/components/VoiceDemo.tsx", VOICE_DEMO_TSX.to_string()),
        GeneratedFile::new("src/config/practice.ts", practice_ts(profile, agent_id)?),
        GeneratedFile::new("next.config.js", NEXT_CONFIG_JS.to_string()),
        GeneratedFile::new("tailwind.config.js", tailwind_config(profile)?),
        GeneratedFile::new("tsconfig.json", TSCONFIG_JSON.to_string()),
    ];
    debug!(stable_id = %profile.stable_id, files = files.len(), "demo template rendered");
    Ok(files)
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| DemoForgeError::parse(format!("template serialization failed: {e}")))
}

fn package_json(profile: &PracticeProfile) -> Result<String> {
    let package = json!({
        "name": format!("{}-voice-demo", profile.stable_id),
        "version": "0.1.0",
        "private": true,
        "scripts": {
            "dev": "next dev",
            "build": "next build",
            "start": "next start -p ${PORT:-3000}"
        },
        "dependencies": {
            "@vapi-ai/web": "^2.1.0",
            "next": "14.2.5",
            "react": "18.3.1",
            "react-dom": "18.3.1"
        },
        "devDependencies": {
            "@types/node": "^20",
            "@types/react": "^18",
            "autoprefixer": "^10.4.19",
            "postcss": "^8.4.38",
            "tailwindcss": "^3.4.4",
            "typescript": "^5"
        }
    });
    Ok(format!("{}\n", to_json(&package)?))
}

fn practice_ts(profile: &PracticeProfile, agent_id: &str) -> Result<String> {
    Ok(format!(
        "// Generated by DemoForge. Edits are overwritten on regeneration.\n\n\
export const practice = {profile} as const;\n\n\
export const agentId = {agent};\n\n\
export const firstMessage = {first};\n\n\
export const systemPrompt = {prompt};\n",
        profile = to_json(profile)?,
        agent = to_json(agent_id)?,
        first = to_json(&opening_line(profile))?,
        prompt = to_json(&system_prompt(profile))?,
    ))
}

fn tailwind_config(profile: &PracticeProfile) -> Result<String> {
    Ok(format!(
        "/** @type {{import('tailwindcss').Config}} */\n\
module.exports = {{\n\
  content: ['./src/**/*.{{ts,tsx}}'],\n\
  theme: {{\n\
    extend: {{\n\
      colors: {{\n\
        brand: {primary},\n\
        accent: {secondary},\n\
      }},\n\
    }},\n\
  }},\n\
  plugins: [],\n\
}};\n",
        primary = to_json(&profile.brand_colors.primary)?,
        secondary = to_json(&profile.brand_colors.secondary)?,
    ))
}

const PAGE_TSX: &str = r#"import VoiceDemo from '@/components/VoiceDemo';
import { practice } from '@/config/practice';

export default function Home() {
  return (
    <main className="min-h-screen bg-accent flex flex-col items-center justify-center p-8">
      <h1 className="text-4xl font-bold text-brand">{practice.companyName}</h1>
      <p className="mt-2 text-gray-600">{practice.location}</p>
      <ul className="mt-6 flex flex-wrap gap-2">
        {practice.services.map((service) => (
          <li key={service} className="rounded-full border border-brand px-3 py-1 text-sm">
            {service}
          </li>
        ))}
      </ul>
      <VoiceDemo />
      <p className="mt-8 text-sm text-gray-500">
        {practice.phone} · {practice.email}
      </p>
    </main>
  );
}
"#;

const VOICE_DEMO_TSX: &str = r#"'use client';

import { useEffect, useRef, useState } from 'react';
import Vapi from '@vapi-ai/web';
import { agentId } from '@/config/practice';

export default function VoiceDemo() {
  const vapi = useRef<Vapi | null>(null);
  const [active, setActive] = useState(false);

  useEffect(() => {
    const client = new Vapi(process.env.NEXT_PUBLIC_VAPI_PUBLIC_KEY ?? '');
    client.on('call-start', () => setActive(true));
    client.on('call-end', () => setActive(false));
    vapi.current = client;
    return () => {
      client.stop();
    };
  }, []);

  const toggle = () => {
    if (active) {
      vapi.current?.stop();
    } else {
      vapi.current?.start(agentId);
    }
  };

  return (
    <button
      onClick={toggle}
      className="mt-8 rounded-lg bg-brand px-6 py-3 font-semibold text-white shadow"
    >
      {active ? 'End call' : 'Talk to our assistant'}
    </button>
  );
}
"#;

const NEXT_CONFIG_JS: &str = r#"/** @type {import('next').NextConfig} */
const nextConfig = {
  reactStrictMode: true,
};

module.exports = nextConfig;
"#;

const TSCONFIG_JSON: &str = r#"{
  "compilerOptions": {
    "target": "es2017",
    "lib": ["dom", "dom.iterable", "esnext"],
    "allowJs": true,
    "skipLibCheck": true,
    "strict": true,
    "noEmit": true,
    "esModuleInterop": true,
    "module": "esnext",
    "moduleResolution": "bundler",
    "resolveJsonModule": true,
    "isolatedModules": true,
    "jsx": "preserve",
    "incremental": true,
    "plugins": [{ "name": "next" }],
    "paths": { "@/*": ["./src/*"] }
  },
  "include": ["next-env.d.ts", "**/*.ts", "**/*.tsx"],
  "exclude": ["node_modules"]
}
"#;
